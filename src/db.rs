//! Database schema and operations

use std::collections::HashMap;

use rusqlite::{Connection, OptionalExtension, Result, Row, params, params_from_iter};

use crate::models::{
    Ingredient, IngredientAmount, IngredientKind, Item, Recipe, SubstitutionGroup,
    Transformation, UpgradeEdge,
};

// SQLite caps bound parameters per statement; batch lookups are split
const MAX_BATCH: usize = 500;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS items (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            icon TEXT,
            category TEXT
        );

        -- rowid order is the catalog order of recipes for one output
        CREATE TABLE IF NOT EXISTS recipes (
            id TEXT PRIMARY KEY,
            output_item_id TEXT NOT NULL,
            output_quantity INTEGER NOT NULL DEFAULT 1,
            station TEXT
        );

        -- item_id holds the group id when is_substitute_group is set
        CREATE TABLE IF NOT EXISTS recipe_ingredients (
            recipe_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            item_id TEXT NOT NULL,
            item_name TEXT,
            quantity INTEGER NOT NULL DEFAULT 1,
            is_substitute_group INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (recipe_id, position)
        );

        CREATE TABLE IF NOT EXISTS substitution_groups (
            id TEXT PRIMARY KEY,
            name TEXT
        );

        CREATE TABLE IF NOT EXISTS substitution_group_members (
            group_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            item_id TEXT NOT NULL,
            PRIMARY KEY (group_id, item_id)
        );

        CREATE TABLE IF NOT EXISTS item_upgrades (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source_item_id TEXT NOT NULL,
            output_item_id TEXT NOT NULL,
            position INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS item_upgrade_ingredients (
            upgrade_id INTEGER NOT NULL,
            position INTEGER NOT NULL,
            item_id TEXT NOT NULL,
            quantity INTEGER NOT NULL DEFAULT 1,
            PRIMARY KEY (upgrade_id, position)
        );

        CREATE TABLE IF NOT EXISTS transformations (
            item_id TEXT PRIMARY KEY,
            cooked_to TEXT,
            burned_to TEXT,
            decayed_to TEXT,
            requires_baking INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_recipes_output ON recipes(output_item_id);
        CREATE INDEX IF NOT EXISTS idx_upgrades_source ON item_upgrades(source_item_id);
        CREATE INDEX IF NOT EXISTS idx_upgrades_output ON item_upgrades(output_item_id);
        CREATE INDEX IF NOT EXISTS idx_transformations_cooked ON transformations(cooked_to);
        "#,
    )
}

/// Clear the whole catalog (for re-import)
pub fn clear_catalog(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM transformations;
        DELETE FROM item_upgrade_ingredients;
        DELETE FROM item_upgrades;
        DELETE FROM substitution_group_members;
        DELETE FROM substitution_groups;
        DELETE FROM recipe_ingredients;
        DELETE FROM recipes;
        DELETE FROM items;
        "#,
    )
}

/// Insert or replace an item
pub fn upsert_item(conn: &Connection, item: &Item) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO items (id, name, icon, category) VALUES (?1, ?2, ?3, ?4)",
        (&item.id, &item.name, &item.icon, &item.category),
    )?;
    Ok(())
}

/// Insert or replace a recipe header, dropping any previous ingredient slots
pub fn upsert_recipe(conn: &Connection, recipe: &Recipe) -> Result<()> {
    conn.execute("DELETE FROM recipe_ingredients WHERE recipe_id = ?1", [&recipe.id])?;
    conn.execute(
        "INSERT OR REPLACE INTO recipes (id, output_item_id, output_quantity, station)
         VALUES (?1, ?2, ?3, ?4)",
        (
            &recipe.id,
            &recipe.output_item_id,
            to_sql_quantity(recipe.output_quantity),
            &recipe.station,
        ),
    )?;
    Ok(())
}

/// Insert one ingredient slot of a recipe
pub fn insert_recipe_ingredient(
    conn: &Connection,
    recipe_id: &str,
    ingredient: &Ingredient,
) -> Result<()> {
    let (item_id, item_name, is_group) = match &ingredient.kind {
        IngredientKind::Item { item_id, item_name } => (item_id, item_name.as_deref(), false),
        IngredientKind::Group { group_id } => (group_id, None, true),
    };
    conn.execute(
        "INSERT OR REPLACE INTO recipe_ingredients
            (recipe_id, position, item_id, item_name, quantity, is_substitute_group)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            recipe_id,
            ingredient.position,
            item_id,
            item_name,
            to_sql_quantity(ingredient.quantity),
            is_group
        ],
    )?;
    Ok(())
}

/// Insert or replace a substitution group with its members
pub fn upsert_substitution_group(conn: &Connection, group: &SubstitutionGroup) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO substitution_groups (id, name) VALUES (?1, ?2)",
        (&group.id, &group.name),
    )?;
    conn.execute(
        "DELETE FROM substitution_group_members WHERE group_id = ?1",
        [&group.id],
    )?;
    for (position, member) in group.members.iter().enumerate() {
        conn.execute(
            "INSERT OR IGNORE INTO substitution_group_members (group_id, position, item_id)
             VALUES (?1, ?2, ?3)",
            params![group.id, position as i64, member],
        )?;
    }
    Ok(())
}

/// Insert or replace an upgrade edge and its ingredients.
///
/// An edge is keyed by `(source, output)`; replacing one keeps its place in
/// edge order.
pub fn upsert_upgrade_edge(conn: &Connection, edge: &UpgradeEdge) -> Result<()> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM item_upgrades WHERE source_item_id = ?1 AND output_item_id = ?2",
            (&edge.source_item_id, &edge.output_item_id),
            |row| row.get(0),
        )
        .optional()?;

    let upgrade_id = match existing {
        Some(id) => {
            conn.execute(
                "UPDATE item_upgrades SET position = ?1 WHERE id = ?2",
                params![edge.position, id],
            )?;
            conn.execute("DELETE FROM item_upgrade_ingredients WHERE upgrade_id = ?1", [id])?;
            id
        }
        None => {
            conn.execute(
                "INSERT INTO item_upgrades (source_item_id, output_item_id, position) VALUES (?1, ?2, ?3)",
                (&edge.source_item_id, &edge.output_item_id, edge.position),
            )?;
            conn.last_insert_rowid()
        }
    };
    for (position, ingredient) in edge.ingredients.iter().enumerate() {
        conn.execute(
            "INSERT INTO item_upgrade_ingredients (upgrade_id, position, item_id, quantity)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                upgrade_id,
                position as i64,
                ingredient.item_id,
                to_sql_quantity(ingredient.quantity)
            ],
        )?;
    }
    Ok(())
}

/// Insert or replace the transformation pointers of an item
pub fn upsert_transformation(conn: &Connection, transformation: &Transformation) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO transformations
            (item_id, cooked_to, burned_to, decayed_to, requires_baking)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            transformation.item_id,
            transformation.cooked_to,
            transformation.burned_to,
            transformation.decayed_to,
            transformation.requires_baking
        ],
    )?;
    Ok(())
}

const ITEM_COLUMNS: &str = "i.id, i.name, i.icon, i.category,
    EXISTS (SELECT 1 FROM recipes r WHERE r.output_item_id = i.id)";

fn item_from_row(row: &Row<'_>) -> Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        name: row.get(1)?,
        icon: row.get(2)?,
        category: row.get(3)?,
        is_craftable: row.get(4)?,
    })
}

/// Get a single item
pub fn get_item(conn: &Connection, item_id: &str) -> Result<Option<Item>> {
    conn.query_row(
        &format!("SELECT {ITEM_COLUMNS} FROM items i WHERE i.id = ?1"),
        [item_id],
        item_from_row,
    )
    .optional()
}

/// Get many items in as few queries as possible. Unknown ids are absent from the map.
pub fn get_items(conn: &Connection, item_ids: &[String]) -> Result<HashMap<String, Item>> {
    let mut results = HashMap::with_capacity(item_ids.len());

    for chunk in item_ids.chunks(MAX_BATCH) {
        let placeholders = vec!["?"; chunk.len()].join(", ");
        let mut stmt = conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM items i WHERE i.id IN ({placeholders})"
        ))?;
        let rows = stmt.query_map(params_from_iter(chunk.iter()), item_from_row)?;
        for row in rows {
            let item = row?;
            results.insert(item.id.clone(), item);
        }
    }

    Ok(results)
}

/// List all items in the catalog
pub fn list_items(conn: &Connection) -> Result<Vec<Item>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ITEM_COLUMNS} FROM items i ORDER BY i.name"
    ))?;
    let rows = stmt.query_map([], item_from_row)?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

fn recipe_from_row(row: &Row<'_>) -> Result<Recipe> {
    Ok(Recipe {
        id: row.get(0)?,
        output_item_id: row.get(1)?,
        output_quantity: from_sql_quantity(row.get(2)?),
        station: row.get(3)?,
    })
}

/// Get a single recipe header
pub fn get_recipe(conn: &Connection, recipe_id: &str) -> Result<Option<Recipe>> {
    conn.query_row(
        "SELECT id, output_item_id, output_quantity, station FROM recipes WHERE id = ?1",
        [recipe_id],
        recipe_from_row,
    )
    .optional()
}

/// Get all recipes that output a given item, in catalog order
pub fn get_recipes_producing(conn: &Connection, item_id: &str) -> Result<Vec<Recipe>> {
    let mut stmt = conn.prepare(
        "SELECT id, output_item_id, output_quantity, station
         FROM recipes
         WHERE output_item_id = ?1
         ORDER BY rowid",
    )?;
    let rows = stmt.query_map([item_id], recipe_from_row)?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// Get the ingredient slots of a recipe, ordered by position
pub fn get_recipe_ingredients(conn: &Connection, recipe_id: &str) -> Result<Vec<Ingredient>> {
    let mut stmt = conn.prepare(
        "SELECT position, item_id, item_name, quantity, is_substitute_group
         FROM recipe_ingredients
         WHERE recipe_id = ?1
         ORDER BY position",
    )?;

    let rows = stmt.query_map([recipe_id], |row| {
        let reference: String = row.get(1)?;
        let is_group: bool = row.get(4)?;
        let kind = if is_group {
            IngredientKind::Group {
                group_id: reference,
            }
        } else {
            IngredientKind::Item {
                item_id: reference,
                item_name: row.get(2)?,
            }
        };
        Ok(Ingredient {
            position: row.get(0)?,
            quantity: from_sql_quantity(row.get(3)?),
            kind,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// Get the members of a substitution group, `None` if the group does not exist
pub fn get_substitution_group_members(
    conn: &Connection,
    group_id: &str,
) -> Result<Option<Vec<String>>> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM substitution_groups WHERE id = ?1)",
        [group_id],
        |row| row.get(0),
    )?;
    if !exists {
        return Ok(None);
    }

    let mut stmt = conn.prepare(
        "SELECT item_id FROM substitution_group_members WHERE group_id = ?1 ORDER BY position",
    )?;
    let rows = stmt.query_map([group_id], |row| row.get(0))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(Some(results))
}

/// Get every upgrade edge in the catalog, in insertion order
pub fn get_all_upgrade_edges(conn: &Connection) -> Result<Vec<UpgradeEdge>> {
    let mut ingredients: HashMap<i64, Vec<IngredientAmount>> = HashMap::new();
    let mut stmt = conn.prepare(
        "SELECT upgrade_id, item_id, quantity
         FROM item_upgrade_ingredients
         ORDER BY upgrade_id, position",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            IngredientAmount {
                item_id: row.get(1)?,
                quantity: from_sql_quantity(row.get(2)?),
            },
        ))
    })?;
    for row in rows {
        let (upgrade_id, amount) = row?;
        ingredients.entry(upgrade_id).or_default().push(amount);
    }

    let mut stmt = conn.prepare(
        "SELECT id, source_item_id, output_item_id, position FROM item_upgrades ORDER BY id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            UpgradeEdge {
                source_item_id: row.get(1)?,
                output_item_id: row.get(2)?,
                position: row.get(3)?,
                ingredients: Vec::new(),
            },
        ))
    })?;

    let mut results = Vec::new();
    for row in rows {
        let (id, mut edge) = row?;
        edge.ingredients = ingredients.remove(&id).unwrap_or_default();
        results.push(edge);
    }
    Ok(results)
}

/// Get the transformation pointers of an item. Items without a row have none.
pub fn get_transformation(conn: &Connection, item_id: &str) -> Result<Transformation> {
    let found = conn
        .query_row(
            "SELECT item_id, cooked_to, burned_to, decayed_to, requires_baking
             FROM transformations
             WHERE item_id = ?1",
            [item_id],
            |row| {
                Ok(Transformation {
                    item_id: row.get(0)?,
                    cooked_to: row.get(1)?,
                    burned_to: row.get(2)?,
                    decayed_to: row.get(3)?,
                    requires_baking: row.get(4)?,
                })
            },
        )
        .optional()?;

    Ok(found.unwrap_or_else(|| Transformation {
        item_id: item_id.to_string(),
        ..Default::default()
    }))
}

/// Find the item that cooks into `item_id`. First match in id order.
pub fn find_cooked_from(conn: &Connection, item_id: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT item_id FROM transformations WHERE cooked_to = ?1 ORDER BY item_id LIMIT 1",
        [item_id],
        |row| row.get(0),
    )
    .optional()
}

/// Row counts per table
#[derive(Debug, Default)]
pub struct CatalogStats {
    pub items: usize,
    pub recipes: usize,
    pub substitution_groups: usize,
    pub upgrades: usize,
    pub transformations: usize,
}

pub fn catalog_stats(conn: &Connection) -> Result<CatalogStats> {
    let count = |table: &str| -> Result<usize> {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get::<_, i64>(0)
        })
        .map(|n| n as usize)
    };

    Ok(CatalogStats {
        items: count("items")?,
        recipes: count("recipes")?,
        substitution_groups: count("substitution_groups")?,
        upgrades: count("item_upgrades")?,
        transformations: count("transformations")?,
    })
}

impl std::fmt::Display for CatalogStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} items, {} recipes, {} substitution groups, {} upgrades, {} transformations",
            self.items, self.recipes, self.substitution_groups, self.upgrades, self.transformations
        )
    }
}

// SQLite integers are signed
fn to_sql_quantity(quantity: u64) -> i64 {
    i64::try_from(quantity).unwrap_or(i64::MAX)
}

fn from_sql_quantity(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn item(id: &str) -> Item {
        Item {
            id: id.to_string(),
            name: id.to_uppercase(),
            icon: None,
            category: None,
            is_craftable: false,
        }
    }

    #[test]
    fn craftable_is_computed_from_recipes() {
        let conn = conn();
        upsert_item(&conn, &item("plank")).unwrap();
        upsert_item(&conn, &item("log")).unwrap();
        upsert_recipe(
            &conn,
            &Recipe {
                id: "r_plank".into(),
                output_item_id: "plank".into(),
                output_quantity: 2,
                station: None,
            },
        )
        .unwrap();

        assert!(get_item(&conn, "plank").unwrap().unwrap().is_craftable);
        assert!(!get_item(&conn, "log").unwrap().unwrap().is_craftable);
        assert!(get_item(&conn, "missing").unwrap().is_none());
    }

    #[test]
    fn batch_lookup_skips_unknown_ids() {
        let conn = conn();
        upsert_item(&conn, &item("a")).unwrap();
        upsert_item(&conn, &item("b")).unwrap();

        let ids = vec!["a".to_string(), "b".to_string(), "ghost".to_string()];
        let found = get_items(&conn, &ids).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found["b"].name, "B");
    }

    #[test]
    fn ingredients_keep_group_references() {
        let conn = conn();
        let slots = [
            Ingredient {
                position: 1,
                quantity: 3,
                kind: IngredientKind::Group {
                    group_id: "AnyWood".into(),
                },
            },
            Ingredient {
                position: 0,
                quantity: 1,
                kind: IngredientKind::Item {
                    item_id: "rope".into(),
                    item_name: Some("Rope".into()),
                },
            },
        ];
        for slot in &slots {
            insert_recipe_ingredient(&conn, "r", slot).unwrap();
        }

        let loaded = get_recipe_ingredients(&conn, "r").unwrap();
        assert_eq!(loaded[0], slots[1]);
        assert_eq!(loaded[1], slots[0]);
    }

    #[test]
    fn unknown_group_is_none_and_empty_group_is_some() {
        let conn = conn();
        upsert_substitution_group(
            &conn,
            &SubstitutionGroup {
                id: "AnyNothing".into(),
                name: None,
                members: vec![],
            },
        )
        .unwrap();

        assert_eq!(get_substitution_group_members(&conn, "AnyGhost").unwrap(), None);
        assert_eq!(
            get_substitution_group_members(&conn, "AnyNothing").unwrap(),
            Some(vec![])
        );
    }

    #[test]
    fn upgrade_edges_carry_their_ingredients() {
        let conn = conn();
        upsert_upgrade_edge(
            &conn,
            &UpgradeEdge {
                source_item_id: "screwdriver".into(),
                output_item_id: "drill".into(),
                position: 0,
                ingredients: vec![IngredientAmount {
                    item_id: "battery".into(),
                    quantity: 2,
                }],
            },
        )
        .unwrap();
        upsert_upgrade_edge(
            &conn,
            &UpgradeEdge {
                source_item_id: "drill".into(),
                output_item_id: "power_drill".into(),
                position: 0,
                ingredients: vec![],
            },
        )
        .unwrap();

        let edges = get_all_upgrade_edges(&conn).unwrap();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].ingredients[0].quantity, 2);
        assert!(edges[1].ingredients.is_empty());
    }

    #[test]
    fn upgrade_edges_upsert_in_place() {
        let conn = conn();
        let edge = |source: &str, output: &str, battery: u64| UpgradeEdge {
            source_item_id: source.into(),
            output_item_id: output.into(),
            position: 0,
            ingredients: vec![IngredientAmount {
                item_id: "battery".into(),
                quantity: battery,
            }],
        };
        upsert_upgrade_edge(&conn, &edge("screwdriver", "drill", 1)).unwrap();
        upsert_upgrade_edge(&conn, &edge("drill", "power_drill", 2)).unwrap();
        upsert_upgrade_edge(&conn, &edge("screwdriver", "drill", 5)).unwrap();

        let edges = get_all_upgrade_edges(&conn).unwrap();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].output_item_id, "drill");
        assert_eq!(edges[0].ingredients.len(), 1);
        assert_eq!(edges[0].ingredients[0].quantity, 5);
    }

    #[test]
    fn missing_transformation_row_has_no_pointers() {
        let conn = conn();
        let t = get_transformation(&conn, "rock").unwrap();
        assert_eq!(t.item_id, "rock");
        assert!(t.cooked_to.is_none() && !t.requires_baking);
    }
}
