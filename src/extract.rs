//! Catalog snapshot import
//!
//! Loads JSON snapshot files exported from the game data into the SQLite
//! catalog. A file may carry any subset of the sections below; references
//! are stored as given, even when they point at nothing.
//!
//! ```json
//! {
//!   "items": [{ "id": "iron_ore", "name": "Iron Ore", "icon": "/Game/UI/Icons/itemicon_ore.itemicon_ore" }],
//!   "recipes": [{ "id": "r_ingot", "output": "iron_ingot", "ingredients": [{ "item": "iron_ore", "quantity": 2 }] }],
//!   "substitution_groups": [{ "id": "AnyOre", "members": ["iron_ore", "copper_ore"] }],
//!   "upgrades": [{ "source": "drill", "upgrades": [{ "output": "power_drill", "ingredients": [] }] }],
//!   "transformations": [{ "item": "raw_meat", "cooked_to": "cooked_meat", "burned_to": "burnt_meat" }]
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use rusqlite::Connection;
use serde::Deserialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::db;
use crate::models::{
    Ingredient, IngredientAmount, IngredientKind, Item, Recipe, SubstitutionGroup,
    Transformation, UpgradeEdge,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Snapshot {
    items: Vec<RawItem>,
    recipes: Vec<RawRecipe>,
    substitution_groups: Vec<RawGroup>,
    upgrades: Vec<RawUpgradeSource>,
    transformations: Vec<RawTransformation>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    id: String,
    name: Option<String>,
    icon: Option<String>,
    category: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRecipe {
    id: String,
    output: String,
    #[serde(default = "one")]
    output_quantity: u64,
    station: Option<String>,
    #[serde(default)]
    ingredients: Vec<RawIngredient>,
}

/// Exactly one of `item` / `group` is expected
#[derive(Debug, Deserialize)]
struct RawIngredient {
    item: Option<String>,
    group: Option<String>,
    name: Option<String>,
    #[serde(default = "one")]
    quantity: u64,
}

#[derive(Debug, Deserialize)]
struct RawGroup {
    id: String,
    name: Option<String>,
    #[serde(default)]
    members: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawUpgradeSource {
    source: String,
    #[serde(default)]
    upgrades: Vec<RawUpgrade>,
}

#[derive(Debug, Deserialize)]
struct RawUpgrade {
    output: String,
    #[serde(default)]
    ingredients: Vec<IngredientAmount>,
}

#[derive(Debug, Deserialize)]
struct RawTransformation {
    item: String,
    cooked_to: Option<String>,
    burned_to: Option<String>,
    decayed_to: Option<String>,
    #[serde(default)]
    requires_baking: bool,
}

fn one() -> u64 {
    1
}

/// Rewrites engine asset paths to icon file names
struct IconNormalizer {
    asset_re: Regex,
}

impl IconNormalizer {
    fn new() -> Result<Self> {
        // /Game/Textures/GUI/ItemIcons/itemicon_x.itemicon_x -> itemicon_x
        let asset_re = Regex::new(r"^/Game/(?:[^/]+/)*([\w-]+)(?:\.[\w-]+)?$")?;
        Ok(Self { asset_re })
    }

    fn normalize(&self, icon: Option<String>) -> Option<String> {
        let icon = icon?.trim().to_string();
        if icon.is_empty() || icon == "None" {
            return None;
        }
        match self.asset_re.captures(&icon) {
            Some(cap) => Some(format!("{}.png", &cap[1])),
            None => Some(icon),
        }
    }
}

/// Find all snapshot files below `dir`, in file name order
pub fn find_snapshot_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect()
}

fn parse_snapshot(path: &Path) -> Result<Snapshot> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Import every snapshot file under `dir` in a single transaction
pub fn import_directory(conn: &Connection, dir: &Path) -> Result<ImportStats> {
    let mut stats = ImportStats::default();
    let icons = IconNormalizer::new()?;

    info!(dir = %dir.display(), "scanning for catalog snapshots");
    let files = find_snapshot_files(dir);
    info!(count = files.len(), "found snapshot files");

    let tx = conn.unchecked_transaction()?;
    for path in &files {
        match parse_snapshot(path) {
            Ok(snapshot) => {
                load_snapshot(&tx, snapshot, &icons, &mut stats)?;
                stats.files += 1;
                debug!(file = %path.display(), "imported");
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "skipping snapshot");
                stats.errors += 1;
            }
        }
    }
    tx.commit()?;

    Ok(stats)
}

fn load_snapshot(
    conn: &Connection,
    snapshot: Snapshot,
    icons: &IconNormalizer,
    stats: &mut ImportStats,
) -> Result<()> {
    for raw in snapshot.items {
        let item = Item {
            name: raw.name.unwrap_or_else(|| raw.id.clone()),
            id: raw.id,
            icon: icons.normalize(raw.icon),
            category: raw.category,
            is_craftable: false,
        };
        db::upsert_item(conn, &item)?;
        stats.items += 1;
    }

    for raw in snapshot.recipes {
        let recipe = Recipe {
            id: raw.id,
            output_item_id: raw.output,
            output_quantity: raw.output_quantity,
            station: raw.station,
        };
        db::upsert_recipe(conn, &recipe)?;

        let mut position = 0u32;
        for ingredient in raw.ingredients {
            let kind = match (ingredient.item, ingredient.group) {
                (Some(item_id), None) => IngredientKind::Item {
                    item_id,
                    item_name: ingredient.name,
                },
                (None, Some(group_id)) => IngredientKind::Group { group_id },
                _ => {
                    warn!(recipe = %recipe.id, "ingredient needs exactly one of item or group");
                    stats.skipped += 1;
                    continue;
                }
            };
            db::insert_recipe_ingredient(
                conn,
                &recipe.id,
                &Ingredient {
                    position,
                    quantity: ingredient.quantity,
                    kind,
                },
            )?;
            position += 1;
            stats.ingredients += 1;
        }
        stats.recipes += 1;
    }

    for raw in snapshot.substitution_groups {
        db::upsert_substitution_group(
            conn,
            &SubstitutionGroup {
                id: raw.id,
                name: raw.name,
                members: raw.members,
            },
        )?;
        stats.groups += 1;
    }

    for raw in snapshot.upgrades {
        for (position, upgrade) in raw.upgrades.into_iter().enumerate() {
            db::upsert_upgrade_edge(
                conn,
                &UpgradeEdge {
                    source_item_id: raw.source.clone(),
                    output_item_id: upgrade.output,
                    position: position as u32,
                    ingredients: upgrade.ingredients,
                },
            )?;
            stats.upgrades += 1;
        }
    }

    for raw in snapshot.transformations {
        db::upsert_transformation(
            conn,
            &Transformation {
                item_id: raw.item,
                cooked_to: raw.cooked_to,
                burned_to: raw.burned_to,
                decayed_to: raw.decayed_to,
                requires_baking: raw.requires_baking,
            },
        )?;
        stats.transformations += 1;
    }

    Ok(())
}

#[derive(Debug, Default)]
pub struct ImportStats {
    pub files: usize,
    pub items: usize,
    pub recipes: usize,
    pub ingredients: usize,
    pub groups: usize,
    pub upgrades: usize,
    pub transformations: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl std::fmt::Display for ImportStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Imported {} files: {} items, {} recipes ({} ingredients), {} substitution groups, {} upgrades, {} transformations. Skipped: {}, Errors: {}",
            self.files,
            self.items,
            self.recipes,
            self.ingredients,
            self.groups,
            self.upgrades,
            self.transformations,
            self.skipped,
            self.errors
        )
    }
}
