//! Shared test helpers: an in-memory catalog and terse seeding functions.

use rusqlite::Connection;

use crate::db;
use crate::models::{
    Ingredient, IngredientAmount, IngredientKind, Item, Recipe, SubstitutionGroup,
    Transformation, UpgradeEdge,
};

/// Fresh in-memory catalog with the schema applied
pub fn memory_db() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn
}

/// Item whose display name is the id in upper case
pub fn add_item(conn: &Connection, id: &str) {
    db::upsert_item(
        conn,
        &Item {
            id: id.to_string(),
            name: id.to_uppercase(),
            icon: Some(format!("{id}.png")),
            category: None,
            is_craftable: false,
        },
    )
    .unwrap();
}

/// A slot in a test recipe: `Slot::item("ore", 2)` or `Slot::group("AnyWood", 1)`
pub enum Slot {
    Item(&'static str, u64),
    Group(&'static str, u64),
}

impl Slot {
    pub fn item(id: &'static str, quantity: u64) -> Self {
        Slot::Item(id, quantity)
    }

    pub fn group(id: &'static str, quantity: u64) -> Self {
        Slot::Group(id, quantity)
    }
}

pub fn add_recipe(conn: &Connection, recipe_id: &str, output: &str, slots: &[Slot]) {
    db::upsert_recipe(
        conn,
        &Recipe {
            id: recipe_id.to_string(),
            output_item_id: output.to_string(),
            output_quantity: 1,
            station: None,
        },
    )
    .unwrap();

    for (position, slot) in slots.iter().enumerate() {
        let (quantity, kind) = match slot {
            Slot::Item(id, quantity) => (
                *quantity,
                IngredientKind::Item {
                    item_id: id.to_string(),
                    item_name: Some(format!("stored {id}")),
                },
            ),
            Slot::Group(id, quantity) => (
                *quantity,
                IngredientKind::Group {
                    group_id: id.to_string(),
                },
            ),
        };
        db::insert_recipe_ingredient(
            conn,
            recipe_id,
            &Ingredient {
                position: position as u32,
                quantity,
                kind,
            },
        )
        .unwrap();
    }
}

pub fn add_group(conn: &Connection, id: &str, members: &[&str]) {
    db::upsert_substitution_group(
        conn,
        &SubstitutionGroup {
            id: id.to_string(),
            name: None,
            members: members.iter().map(|m| m.to_string()).collect(),
        },
    )
    .unwrap();
}

pub fn add_upgrade(conn: &Connection, source: &str, output: &str, cost: &[(&str, u64)]) {
    db::upsert_upgrade_edge(
        conn,
        &UpgradeEdge {
            source_item_id: source.to_string(),
            output_item_id: output.to_string(),
            position: 0,
            ingredients: cost
                .iter()
                .map(|(id, quantity)| IngredientAmount {
                    item_id: id.to_string(),
                    quantity: *quantity,
                })
                .collect(),
        },
    )
    .unwrap();
}

pub fn add_transformation(
    conn: &Connection,
    item: &str,
    cooked_to: Option<&str>,
    burned_to: Option<&str>,
    decayed_to: Option<&str>,
) {
    db::upsert_transformation(
        conn,
        &Transformation {
            item_id: item.to_string(),
            cooked_to: cooked_to.map(str::to_string),
            burned_to: burned_to.map(str::to_string),
            decayed_to: decayed_to.map(str::to_string),
            requires_baking: false,
        },
    )
    .unwrap();
}

/// The iron sword catalog: ingot <- 2 ore, sword <- 3 ingot + 1 handle
pub fn iron_sword_catalog() -> Connection {
    let conn = memory_db();
    for id in ["iron_ore", "wood_handle", "iron_ingot", "iron_sword"] {
        add_item(&conn, id);
    }
    add_recipe(&conn, "r_ingot", "iron_ingot", &[Slot::item("iron_ore", 2)]);
    add_recipe(
        &conn,
        "r_sword",
        "iron_sword",
        &[Slot::item("iron_ingot", 3), Slot::item("wood_handle", 1)],
    );
    conn
}
