//! Read-only catalog access used by the resolvers

use std::collections::HashMap;

use rusqlite::Connection;

use crate::db;
use crate::error::Result;
use crate::models::{Ingredient, Item, Recipe, Transformation, UpgradeEdge};

/// Lookups the resolvers need from the item/recipe store.
///
/// Implementations must be a consistent snapshot for the duration of one
/// resolution; nothing is cached across calls.
pub trait Catalog {
    fn get_item(&self, item_id: &str) -> Result<Option<Item>>;

    /// Batch variant of [`Catalog::get_item`]; unknown ids are left out
    fn get_items(&self, item_ids: &[String]) -> Result<HashMap<String, Item>>;

    fn get_recipe(&self, recipe_id: &str) -> Result<Option<Recipe>>;

    /// Recipes outputting `item_id`. Order decides which variant is "first".
    fn get_recipes_producing(&self, item_id: &str) -> Result<Vec<Recipe>>;

    fn get_recipe_ingredients(&self, recipe_id: &str) -> Result<Vec<Ingredient>>;

    /// `None` when the group id is dangling
    fn get_substitution_group_members(&self, group_id: &str) -> Result<Option<Vec<String>>>;

    fn get_all_upgrade_edges(&self) -> Result<Vec<UpgradeEdge>>;

    fn get_transformation(&self, item_id: &str) -> Result<Transformation>;

    /// The item whose `cooked_to` points at `item_id`
    fn find_cooked_from(&self, item_id: &str) -> Result<Option<String>>;
}

/// [`Catalog`] backed by the SQLite store
pub struct SqliteCatalog<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteCatalog<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

impl Catalog for SqliteCatalog<'_> {
    fn get_item(&self, item_id: &str) -> Result<Option<Item>> {
        Ok(db::get_item(self.conn, item_id)?)
    }

    fn get_items(&self, item_ids: &[String]) -> Result<HashMap<String, Item>> {
        Ok(db::get_items(self.conn, item_ids)?)
    }

    fn get_recipe(&self, recipe_id: &str) -> Result<Option<Recipe>> {
        Ok(db::get_recipe(self.conn, recipe_id)?)
    }

    fn get_recipes_producing(&self, item_id: &str) -> Result<Vec<Recipe>> {
        Ok(db::get_recipes_producing(self.conn, item_id)?)
    }

    fn get_recipe_ingredients(&self, recipe_id: &str) -> Result<Vec<Ingredient>> {
        Ok(db::get_recipe_ingredients(self.conn, recipe_id)?)
    }

    fn get_substitution_group_members(&self, group_id: &str) -> Result<Option<Vec<String>>> {
        Ok(db::get_substitution_group_members(self.conn, group_id)?)
    }

    fn get_all_upgrade_edges(&self) -> Result<Vec<UpgradeEdge>> {
        Ok(db::get_all_upgrade_edges(self.conn)?)
    }

    fn get_transformation(&self, item_id: &str) -> Result<Transformation> {
        Ok(db::get_transformation(self.conn, item_id)?)
    }

    fn find_cooked_from(&self, item_id: &str) -> Result<Option<String>> {
        Ok(db::find_cooked_from(self.conn, item_id)?)
    }
}
