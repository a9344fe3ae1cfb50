//! Craft Resolver
//!
//! Crafting dependency, upgrade and cooking chain resolver for a game
//! item catalog.

mod calculator;
mod catalog;
mod chain;
mod config;
mod cooking;
mod db;
mod error;
mod extract;
mod models;
mod upgrades;
mod variants;

#[cfg(test)]
mod test_utils;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::catalog::SqliteCatalog;
use crate::config::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_VARIANTS, ResolverConfig, VariantSelection};
use crate::error::ResolveError;
use crate::models::{
    Ingredient, IngredientAmount, IngredientKind, Item, Recipe, SubstitutionGroup,
    Transformation, UpgradeEdge,
};

#[derive(Parser)]
#[command(name = "craft-resolver")]
#[command(about = "Crafting dependency, upgrade and cooking chain resolver")]
struct Cli {
    /// Path to the SQLite database
    #[arg(short, long, global = true, env = "CRAFT_DATABASE", default_value = "craft_data.db")]
    database: PathBuf,

    /// Dependency trees stop expanding below this depth
    #[arg(long, global = true, env = "CRAFT_MAX_DEPTH", default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Cap on substitution variants per recipe
    #[arg(long, global = true, env = "CRAFT_MAX_VARIANTS", default_value_t = DEFAULT_MAX_VARIANTS)]
    max_variants: usize,

    /// Recipe variant to follow: first, cheapest or an index
    #[arg(long, global = true, env = "CRAFT_SELECTION", default_value = "first")]
    selection: VariantSelection,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize empty database with schema
    Init,

    /// Import catalog snapshot files (*.json) from a directory
    Import {
        /// Directory to scan recursively
        dir: PathBuf,

        /// Clear existing data before import
        #[arg(long)]
        clear: bool,
    },

    /// Load a small sample catalog for testing
    LoadSample,

    /// List all items in the catalog
    ListItems,

    /// Show the dependency tree for crafting an item
    Tree {
        /// Item id
        item: String,

        /// How many to craft
        #[arg(short, long, default_value_t = 1)]
        quantity: u64,

        #[arg(long)]
        json: bool,
    },

    /// Total the base resources needed to craft an item
    Resources {
        /// Item id
        item: String,

        /// How many to craft
        #[arg(short, long, default_value_t = 1)]
        quantity: u64,

        #[arg(long)]
        json: bool,
    },

    /// Show the upgrade tree an item belongs to
    Upgrades {
        /// Item id
        item: String,

        #[arg(long)]
        json: bool,
    },

    /// Show the cooking chain an item belongs to
    Cooking {
        /// Item id
        item: String,

        #[arg(long)]
        json: bool,
    },

    /// Expand every substitution variant of a recipe
    Variants {
        /// Recipe id
        recipe: String,

        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            max_depth: self.max_depth,
            max_variants: self.max_variants,
            selection: self.selection,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "craft_resolver=info".into()),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        match e.downcast_ref::<ResolveError>() {
            Some(err) if err.is_not_found() => {
                eprintln!("{}", err);
                std::process::exit(2);
            }
            _ => {
                eprintln!("Error: {:#}", e);
                std::process::exit(1);
            }
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = cli.resolver_config();
    debug!(?config, database = %cli.database.display(), "starting");

    let conn = Connection::open(&cli.database)?;
    db::init_schema(&conn)?;
    let catalog = SqliteCatalog::new(&conn);

    match cli.command {
        Commands::Init => {
            println!("Database initialized at: {}", cli.database.display());
            println!("{}", db::catalog_stats(&conn)?);
        }

        Commands::Import { dir, clear } => {
            if clear {
                println!("Clearing existing data...");
                db::clear_catalog(&conn)?;
            }

            let stats = extract::import_directory(&conn, &dir)?;
            println!("\n{}", stats);
        }

        Commands::LoadSample => {
            load_sample_data(&conn)?;
            println!("Sample data loaded: {}", db::catalog_stats(&conn)?);
        }

        Commands::ListItems => {
            let items = db::list_items(&conn)?;
            if items.is_empty() {
                println!("No items in database. Run 'import' or 'load-sample' first.");
            } else {
                println!("{:<24} {:<30} {:>9}", "Id", "Name", "Craftable");
                println!("{}", "-".repeat(65));
                for item in items {
                    let craftable = if item.is_craftable { "yes" } else { "" };
                    println!("{:<24} {:<30} {:>9}", item.id, item.name, craftable);
                }
            }
        }

        Commands::Tree {
            item,
            quantity,
            json,
        } => {
            let tree = calculator::resolve_dependency_tree(&catalog, &item, quantity, &config)?;
            if json {
                print_json(&tree)?;
            } else {
                print!("{}", calculator::format_dependency_tree(&tree.root, 0));
                if tree.cycle_detected {
                    println!("\nNote: a recipe cycle was cut.");
                }
                if tree.depth_limited {
                    println!("\nNote: expansion stopped at depth {}.", config.max_depth);
                }
            }
        }

        Commands::Resources {
            item,
            quantity,
            json,
        } => {
            if json {
                let resources =
                    calculator::calculate_total_resources(&catalog, &item, quantity, &config)?;
                print_json(&resources)?;
            } else {
                let tree = calculator::resolve_dependency_tree(&catalog, &item, quantity, &config)?;
                println!("{}", calculator::ResourceSummary::new(&tree));
            }
        }

        Commands::Upgrades { item, json } => {
            let tree = upgrades::upgrade_tree(&catalog, &item, &config)?;
            match tree {
                Some(tree) if json => print_json(&tree)?,
                Some(tree) => {
                    print!("{}", upgrades::format_upgrade_tree(&tree.root, &tree.origin, 0));
                    if tree.multiple_parents {
                        println!("\nNote: some items are reached by more than one upgrade.");
                    }
                    if tree.truncated_due_to_cycle {
                        println!("\nNote: an upgrade cycle was cut.");
                    }
                }
                None if json => println!("null"),
                None => println!("'{}' has no upgrades", item),
            }
        }

        Commands::Cooking { item, json } => {
            let chain = cooking::cooking_chain(&catalog, &item)?;
            if json {
                print_json(&chain)?;
            } else if chain.steps.is_empty() {
                println!("'{}' is not part of a cooking chain", item);
            } else {
                for (i, step) in chain.steps.iter().enumerate() {
                    let arrow = if i == 0 { "  " } else { "→ " };
                    let name = step.name.as_deref().unwrap_or("?");
                    let baking = if step.requires_baking { " (baked)" } else { "" };
                    println!("{}{} [{}]{}", arrow, name, step.item_id, baking);
                    if let Some(burnt) = &step.burns_to {
                        println!("      burns to {}", burnt);
                    }
                    if let Some(rotten) = &step.decays_to {
                        println!("      decays to {}", rotten);
                    }
                }
                if chain.truncated_due_to_cycle {
                    println!("\nNote: a cooking cycle was cut.");
                }
            }
        }

        Commands::Variants { recipe, json } => {
            let expanded = variants::expand_recipe_variants(&catalog, &recipe, config.max_variants)?;
            if json {
                print_json(&expanded)?;
            } else {
                println!("{} variant(s) of {}:", expanded.len(), recipe);
                for (i, variant) in expanded.iter().enumerate() {
                    let parts: Vec<String> = variant
                        .ingredients
                        .iter()
                        .map(|ing| match &ing.substituted_from {
                            Some(group) => format!("{}x {} (from {})", ing.quantity, ing.item_id, group),
                            None => format!("{}x {}", ing.quantity, ing.item_id),
                        })
                        .collect();
                    println!(
                        "  #{:<3} {}x {} <- {}",
                        i, variant.output_quantity, variant.output_item_id,
                        parts.join(", ")
                    );
                }
            }
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Load a sample catalog covering recipes, substitutions, upgrades and cooking
fn load_sample_data(conn: &Connection) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    db::clear_catalog(&tx)?;

    let items = [
        ("iron_ore", "Iron Ore", "Resources"),
        ("iron_ingot", "Iron Ingot", "Materials"),
        ("oak_log", "Oak Log", "Resources"),
        ("pine_log", "Pine Log", "Resources"),
        ("wood_handle", "Wood Handle", "Materials"),
        ("iron_sword", "Iron Sword", "Weapons"),
        ("stone", "Stone", "Resources"),
        ("wooden_pickaxe", "Wooden Pickaxe", "Tools"),
        ("stone_pickaxe", "Stone Pickaxe", "Tools"),
        ("iron_pickaxe", "Iron Pickaxe", "Tools"),
        ("raw_meat", "Raw Meat", "Food"),
        ("cooked_meat", "Cooked Meat", "Food"),
        ("burnt_food", "Burnt Food", "Food"),
        ("rotten_food", "Rotten Food", "Food"),
        ("dough", "Dough", "Food"),
        ("bread", "Bread", "Food"),
    ];
    for (id, name, category) in items {
        db::upsert_item(
            &tx,
            &Item {
                id: id.to_string(),
                name: name.to_string(),
                icon: Some(format!("itemicon_{}.png", id)),
                category: Some(category.to_string()),
                is_craftable: false,
            },
        )?;
    }

    db::upsert_substitution_group(
        &tx,
        &SubstitutionGroup {
            id: "AnyLog".to_string(),
            name: Some("Any Log".to_string()),
            members: vec!["oak_log".to_string(), "pine_log".to_string()],
        },
    )?;

    let recipes: [(&str, &str, &str, Vec<(u64, IngredientKind)>); 4] = [
        ("r_iron_ingot", "iron_ingot", "Furnace", vec![(2, item_slot("iron_ore", "Iron Ore"))]),
        ("r_wood_handle", "wood_handle", "Workbench", vec![(1, group_slot("AnyLog"))]),
        (
            "r_iron_sword",
            "iron_sword",
            "Anvil",
            vec![
                (3, item_slot("iron_ingot", "Iron Ingot")),
                (1, item_slot("wood_handle", "Wood Handle")),
            ],
        ),
        ("r_wooden_pickaxe", "wooden_pickaxe", "Workbench", vec![(3, group_slot("AnyLog"))]),
    ];
    for (id, output, station, slots) in recipes {
        let recipe = Recipe {
            id: id.to_string(),
            output_item_id: output.to_string(),
            output_quantity: 1,
            station: Some(station.to_string()),
        };
        db::upsert_recipe(&tx, &recipe)?;
        for (position, (quantity, kind)) in slots.into_iter().enumerate() {
            db::insert_recipe_ingredient(
                &tx,
                &recipe.id,
                &Ingredient {
                    position: position as u32,
                    quantity,
                    kind,
                },
            )?;
        }
    }

    let upgrades = [
        ("wooden_pickaxe", "stone_pickaxe", ("stone", 3)),
        ("stone_pickaxe", "iron_pickaxe", ("iron_ingot", 3)),
    ];
    for (source, output, (cost_id, cost_qty)) in upgrades {
        db::upsert_upgrade_edge(
            &tx,
            &UpgradeEdge {
                source_item_id: source.to_string(),
                output_item_id: output.to_string(),
                position: 0,
                ingredients: vec![IngredientAmount {
                    item_id: cost_id.to_string(),
                    quantity: cost_qty,
                }],
            },
        )?;
    }

    let transformations = [
        ("raw_meat", Some("cooked_meat"), false),
        ("cooked_meat", None, false),
        ("dough", Some("bread"), true),
        ("bread", None, false),
    ];
    for (id, cooked_to, requires_baking) in transformations {
        db::upsert_transformation(
            &tx,
            &Transformation {
                item_id: id.to_string(),
                cooked_to: cooked_to.map(str::to_string),
                burned_to: Some("burnt_food".to_string()),
                decayed_to: Some("rotten_food".to_string()),
                requires_baking,
            },
        )?;
    }

    tx.commit()?;
    Ok(())
}

fn item_slot(id: &str, name: &str) -> IngredientKind {
    IngredientKind::Item {
        item_id: id.to_string(),
        item_name: Some(name.to_string()),
    }
}

fn group_slot(id: &str) -> IngredientKind {
    IngredientKind::Group {
        group_id: id.to_string(),
    }
}
