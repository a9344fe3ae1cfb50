//! Dependency tree and base resource calculation

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::chain::Arena;
use crate::config::{ResolverConfig, VariantSelection};
use crate::error::{ResolveError, Result};
use crate::models::{ConcreteRecipe, DependencyNode, DependencyTree, ResourceEntry};
use crate::variants;

/// One node while the tree is still flat
#[derive(Debug)]
struct Draft {
    item_id: String,
    name: String,
    quantity: u64,
    craftable: bool,
}

/// Resolve what it takes to build `quantity` of `item_id`.
///
/// Each craftable node is unfolded through one recipe variant picked by
/// `config.selection`; children get the ingredient quantity multiplied by
/// the parent's. An item that already occurs on the path from the root
/// becomes a non-craftable leaf, as does anything at `config.max_depth`.
/// Only an unknown root is an error; unknown ingredients become leaves
/// named after the recipe's stored ingredient name.
pub fn resolve_dependency_tree(
    catalog: &impl Catalog,
    item_id: &str,
    quantity: u64,
    config: &ResolverConfig,
) -> Result<DependencyTree> {
    let root = catalog
        .get_item(item_id)?
        .ok_or_else(|| ResolveError::item_not_found(item_id))?;

    let mut arena = Arena::new(Draft {
        item_id: root.id,
        name: root.name,
        quantity,
        craftable: root.is_craftable,
    });
    let mut cycle_detected = false;
    let mut depth_limited = false;
    let mut stack = vec![0usize];

    while let Some(idx) = stack.pop() {
        let node = arena.get(idx);
        if !node.value.craftable {
            continue;
        }
        if node.depth >= config.max_depth {
            debug!(item = %node.value.item_id, depth = node.depth, "depth ceiling reached");
            depth_limited = true;
            continue;
        }

        let parent_quantity = node.value.quantity;
        let Some(variant) = select_variant(catalog, &node.value.item_id, config)? else {
            // Craftable flag and recipe table disagree
            arena.get_mut(idx).value.craftable = false;
            continue;
        };

        let ids: Vec<String> = variant
            .ingredients
            .iter()
            .map(|i| i.item_id.clone())
            .collect();
        let known = catalog.get_items(&ids)?;

        let mut pushed = Vec::with_capacity(variant.ingredients.len());
        for ingredient in variant.ingredients {
            let child_quantity = ingredient.quantity.saturating_mul(parent_quantity);

            if arena.on_path(idx, |d| d.item_id == ingredient.item_id) {
                cycle_detected = true;
                let name = known
                    .get(&ingredient.item_id)
                    .map(|item| item.name.clone())
                    .unwrap_or_else(|| ingredient.item_id.clone());
                arena.push(
                    idx,
                    Draft {
                        item_id: ingredient.item_id,
                        name,
                        quantity: child_quantity,
                        craftable: false,
                    },
                );
                continue;
            }

            // Two slots may name the same item, so the batch stays intact
            let draft = match known.get(&ingredient.item_id).cloned() {
                Some(item) => Draft {
                    item_id: item.id,
                    name: item.name,
                    quantity: child_quantity,
                    craftable: item.is_craftable,
                },
                None => {
                    debug!(item = %ingredient.item_id, "ingredient missing from catalog");
                    Draft {
                        name: ingredient
                            .item_name
                            .unwrap_or_else(|| ingredient.item_id.clone()),
                        item_id: ingredient.item_id,
                        quantity: child_quantity,
                        craftable: false,
                    }
                }
            };
            let expand = draft.craftable;
            let child = arena.push(idx, draft);
            if expand {
                pushed.push(child);
            }
        }
        stack.extend(pushed.into_iter().rev());
    }

    if cycle_detected {
        warn!(item = %item_id, "recipe cycle truncated");
    }
    debug!(item = %item_id, nodes = arena.len(), "dependency tree resolved");

    let root = arena.fold(|draft, children| DependencyNode {
        item_id: draft.item_id,
        name: draft.name,
        quantity: draft.quantity,
        craftable: draft.craftable,
        children,
    });

    Ok(DependencyTree {
        root,
        cycle_detected,
        depth_limited,
    })
}

/// Pick the recipe variant the tree follows for `item_id`
fn select_variant(
    catalog: &impl Catalog,
    item_id: &str,
    config: &ResolverConfig,
) -> Result<Option<ConcreteRecipe>> {
    let recipes = catalog.get_recipes_producing(item_id)?;
    let Some(first) = recipes.first() else {
        return Ok(None);
    };
    let lookup = |group: &str| catalog.get_substitution_group_members(group);

    if config.selection == VariantSelection::First {
        let ingredients = catalog.get_recipe_ingredients(&first.id)?;
        return variants::first_variant(first, &ingredients, lookup).map(Some);
    }

    let mut candidates = Vec::new();
    for recipe in &recipes {
        let ingredients = catalog.get_recipe_ingredients(&recipe.id)?;
        match variants::expand(recipe, &ingredients, lookup, config.max_variants) {
            Ok(expanded) => candidates.extend(expanded),
            Err(ResolveError::TooManyVariants { count, limit, .. }) => {
                warn!(recipe = %recipe.id, count = %count, limit, "too many variants, using the first");
                candidates.push(variants::first_variant(recipe, &ingredients, lookup)?);
            }
            Err(e) => return Err(e),
        }
    }

    let picked = match config.selection {
        VariantSelection::Cheapest => candidates
            .into_iter()
            .min_by_key(ConcreteRecipe::total_quantity),
        VariantSelection::Index(n) => {
            if n >= candidates.len() {
                warn!(item = %item_id, index = n, available = candidates.len(), "variant index out of range, using the first");
            }
            let mut candidates = candidates.into_iter();
            let first = candidates.next();
            if n == 0 { first } else { candidates.nth(n - 1).or(first) }
        }
        VariantSelection::First => candidates.into_iter().next(),
    };
    Ok(picked)
}

/// Sum the quantities of every leaf in the tree, largest total first.
///
/// Intermediate nodes never count; equal totals keep the order in which
/// their item was first met walking the tree depth first.
pub fn total_resources(tree: &DependencyNode) -> Vec<ResourceEntry> {
    let mut entries: Vec<ResourceEntry> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut stack = vec![tree];

    while let Some(node) = stack.pop() {
        if node.children.is_empty() {
            match index.get(node.item_id.as_str()) {
                Some(&i) => {
                    entries[i].total_quantity = entries[i].total_quantity.saturating_add(node.quantity);
                }
                None => {
                    index.insert(&node.item_id, entries.len());
                    entries.push(ResourceEntry {
                        item_id: node.item_id.clone(),
                        name: node.name.clone(),
                        total_quantity: node.quantity,
                        // Craftable leaves only occur where the depth ceiling cut in
                        is_base_resource: !node.craftable,
                    });
                }
            }
        } else {
            stack.extend(node.children.iter().rev());
        }
    }

    // Stable, so ties keep first-seen order
    entries.sort_by(|a, b| b.total_quantity.cmp(&a.total_quantity));
    entries
}

/// Resolve the tree for `item_id` and total its base resources
pub fn calculate_total_resources(
    catalog: &impl Catalog,
    item_id: &str,
    quantity: u64,
    config: &ResolverConfig,
) -> Result<Vec<ResourceEntry>> {
    let tree = resolve_dependency_tree(catalog, item_id, quantity, config)?;
    Ok(total_resources(&tree.root))
}

/// Format a dependency tree as a readable string
pub fn format_dependency_tree(node: &DependencyNode, indent: usize) -> String {
    let mut output = String::new();
    let prefix = "  ".repeat(indent);

    if node.children.is_empty() {
        let tag = if node.craftable { " (not expanded)" } else { "" };
        output.push_str(&format!(
            "{}→ {}x {} [{}]{}\n",
            prefix, node.quantity, node.name, node.item_id, tag
        ));
    } else {
        output.push_str(&format!(
            "{}{}x {} [{}]\n",
            prefix, node.quantity, node.name, node.item_id
        ));
        for child in &node.children {
            output.push_str(&format_dependency_tree(child, indent + 1));
        }
    }

    output
}

/// Summary of the base resources behind a target
#[derive(Debug)]
pub struct ResourceSummary {
    pub target: String,
    pub quantity: u64,
    pub resources: Vec<ResourceEntry>,
    pub cycle_detected: bool,
    pub depth_limited: bool,
}

impl ResourceSummary {
    pub fn new(tree: &DependencyTree) -> Self {
        Self {
            target: tree.root.name.clone(),
            quantity: tree.root.quantity,
            resources: total_resources(&tree.root),
            cycle_detected: tree.cycle_detected,
            depth_limited: tree.depth_limited,
        }
    }
}

impl std::fmt::Display for ResourceSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Resource Summary ===")?;
        writeln!(f, "Target: {}x {}", self.quantity, self.target)?;
        writeln!(f)?;

        writeln!(f, "Base resources required:")?;
        for entry in &self.resources {
            writeln!(f, "  {:>8}x {} [{}]", entry.total_quantity, entry.name, entry.item_id)?;
        }

        if self.cycle_detected {
            writeln!(f)?;
            writeln!(f, "Note: a recipe cycle was cut; totals are partial.")?;
        }
        if self.depth_limited {
            writeln!(f)?;
            writeln!(f, "Note: the depth limit was reached; totals are partial.")?;
        }

        Ok(())
    }
}
