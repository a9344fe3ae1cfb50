//! Upgrade tree resolution

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::chain::{self, PredecessorGraph, RootLookup};
use crate::config::ResolverConfig;
use crate::error::{ResolveError, Result};
use crate::models::{IngredientAmount, UpgradeEdge, UpgradeTree, UpgradeTreeNode};

/// Adjacency over the whole upgrade edge set, built once per query
#[derive(Debug, Default)]
pub struct UpgradeGraph {
    children_of: HashMap<String, Vec<String>>,
    // Every source per output, in edge order
    parents_of: HashMap<String, Vec<String>>,
    costs: HashMap<(String, String), Vec<IngredientAmount>>,
}

impl UpgradeGraph {
    pub fn from_edges(edges: Vec<UpgradeEdge>) -> Self {
        let mut graph = Self::default();

        for edge in edges {
            let children = graph.children_of.entry(edge.source_item_id.clone()).or_default();
            if !children.contains(&edge.output_item_id) {
                children.push(edge.output_item_id.clone());
            }

            let parents = graph.parents_of.entry(edge.output_item_id.clone()).or_default();
            if let Some(pos) = parents.iter().position(|p| *p == edge.source_item_id) {
                parents.remove(pos);
            }
            parents.push(edge.source_item_id.clone());

            graph
                .costs
                .insert((edge.source_item_id, edge.output_item_id), edge.ingredients);
        }

        graph
    }

    pub fn parents(&self, item_id: &str) -> &[String] {
        self.parents_of.get(item_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ingredients of the upgrade `source -> output`
    pub fn cost(&self, source: &str, output: &str) -> Vec<IngredientAmount> {
        self.costs
            .get(&(source.to_string(), output.to_string()))
            .cloned()
            .unwrap_or_default()
    }
}

impl PredecessorGraph for UpgradeGraph {
    type Id = String;

    fn contains(&self, id: &String) -> Result<bool> {
        Ok(self.children_of.contains_key(id) || self.parents_of.contains_key(id))
    }

    // The most recently listed source wins when an output has several
    fn predecessor(&self, id: &String) -> Result<Option<String>> {
        Ok(self.parents(id).last().cloned())
    }

    fn successors(&self, id: &String) -> Result<Vec<String>> {
        Ok(self.children_of.get(id).cloned().unwrap_or_default())
    }
}

/// Build the upgrade tree containing `item_id`.
///
/// The tree is rooted at the top of the item's upgrade chain, so every
/// item of one connected chain yields the same tree; only `origin`
/// differs. Returns `None` when the item takes part in no upgrade.
pub fn upgrade_tree(
    catalog: &impl Catalog,
    item_id: &str,
    config: &ResolverConfig,
) -> Result<Option<UpgradeTree>> {
    if catalog.get_item(item_id)?.is_none() {
        return Err(ResolveError::item_not_found(item_id));
    }

    let graph = UpgradeGraph::from_edges(catalog.get_all_upgrade_edges()?);
    upgrade_tree_in(catalog, &graph, item_id, config)
}

/// [`upgrade_tree`] over a graph that is already loaded
pub fn upgrade_tree_in(
    catalog: &impl Catalog,
    graph: &UpgradeGraph,
    item_id: &str,
    config: &ResolverConfig,
) -> Result<Option<UpgradeTree>> {
    let origin = item_id.to_string();
    let (root, root_cycle) = match chain::find_root(graph, &origin)? {
        RootLookup::NotInGraph => {
            debug!(item = %item_id, "item has no upgrades");
            return Ok(None);
        }
        RootLookup::Resolved {
            root,
            truncated_due_to_cycle,
        } => (root, truncated_due_to_cycle),
    };

    let reachable = chain::collect_reachable(graph, &root)?;
    let multiple_parents = reachable.iter().any(|id| graph.parents(id).len() > 1);
    let items = catalog.get_items(&reachable)?;

    let walk = chain::build_tree(graph, &root, config.max_depth)?;
    let truncated_due_to_cycle = root_cycle || walk.cycle_cut;
    if truncated_due_to_cycle {
        warn!(item = %item_id, root = %root, "upgrade cycle truncated");
    }

    let tree = walk.arena.fold(|id, mut children: Vec<UpgradeTreeNode>| {
        for child in &mut children {
            child.cost = graph.cost(&id, &child.item_id);
        }
        let item = items.get(&id);
        UpgradeTreeNode {
            name: item.map(|i| i.name.clone()),
            icon: item.and_then(|i| i.icon.clone()),
            item_id: id,
            cost: Vec::new(),
            children,
        }
    });

    Ok(Some(UpgradeTree {
        root: tree,
        origin,
        truncated_due_to_cycle,
        depth_limited: walk.depth_cut,
        multiple_parents,
    }))
}

/// Format an upgrade tree, marking the queried item
pub fn format_upgrade_tree(node: &UpgradeTreeNode, origin: &str, indent: usize) -> String {
    let mut output = String::new();
    let prefix = "  ".repeat(indent);
    let marker = if node.item_id == origin { " <==" } else { "" };
    let name = node.name.as_deref().unwrap_or("?");

    let cost = if node.cost.is_empty() {
        String::new()
    } else {
        let parts: Vec<String> = node
            .cost
            .iter()
            .map(|c| format!("{}x {}", c.quantity, c.item_id))
            .collect();
        format!(" (+ {})", parts.join(", "))
    };

    output.push_str(&format!(
        "{}{} [{}]{}{}\n",
        prefix, name, node.item_id, cost, marker
    ));
    for child in &node.children {
        output.push_str(&format_upgrade_tree(child, origin, indent + 1));
    }

    output
}
