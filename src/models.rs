//! Data models for catalog items, recipes and resolution results

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub icon: Option<String>,
    pub category: Option<String>,
    pub is_craftable: bool, // At least one recipe outputs this item
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    pub id: String,
    pub output_item_id: String,
    pub output_quantity: u64,
    pub station: Option<String>,
}

/// What an ingredient slot asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngredientKind {
    /// A specific item. `item_name` is the name stored alongside the recipe,
    /// used when the item itself is missing from the catalog.
    Item {
        item_id: String,
        item_name: Option<String>,
    },
    /// Any member of a substitution group satisfies the slot
    Group { group_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ingredient {
    pub position: u32,
    pub quantity: u64,
    pub kind: IngredientKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionGroup {
    pub id: String,
    pub name: Option<String>,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientAmount {
    pub item_id: String,
    pub quantity: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeEdge {
    pub source_item_id: String,
    pub output_item_id: String,
    pub position: u32,
    pub ingredients: Vec<IngredientAmount>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transformation {
    pub item_id: String,
    pub cooked_to: Option<String>,
    pub burned_to: Option<String>,
    pub decayed_to: Option<String>,
    pub requires_baking: bool,
}

/// A recipe with every substitution slot pinned to one item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConcreteRecipe {
    pub recipe_id: String,
    pub output_item_id: String,
    pub output_quantity: u64,
    pub ingredients: Vec<ConcreteIngredient>,
}

impl ConcreteRecipe {
    pub fn total_quantity(&self) -> u64 {
        self.ingredients
            .iter()
            .fold(0u64, |acc, i| acc.saturating_add(i.quantity))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConcreteIngredient {
    pub item_id: String,
    pub item_name: Option<String>,
    pub quantity: u64,
    pub position: u32,
    /// Still a group reference: the group could not be resolved
    pub is_substitute_group: bool,
    /// Group this item was picked from
    pub substituted_from: Option<String>,
}

/// Result of a dependency resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyTree {
    pub root: DependencyNode,
    pub cycle_detected: bool,
    pub depth_limited: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyNode {
    pub item_id: String,
    pub name: String,
    pub quantity: u64,
    pub craftable: bool,
    pub children: Vec<DependencyNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceEntry {
    pub item_id: String,
    pub name: String,
    pub total_quantity: u64,
    pub is_base_resource: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpgradeTree {
    pub root: UpgradeTreeNode,
    /// The item the query started from
    pub origin: String,
    pub truncated_due_to_cycle: bool,
    pub depth_limited: bool,
    /// Some item in the tree is the output of more than one upgrade
    pub multiple_parents: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpgradeTreeNode {
    pub item_id: String,
    pub name: Option<String>,
    pub icon: Option<String>,
    /// Ingredients of the upgrade leading into this node
    pub cost: Vec<IngredientAmount>,
    pub children: Vec<UpgradeTreeNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CookingChain {
    pub steps: Vec<LinkedItem>,
    pub truncated_due_to_cycle: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkedItem {
    pub item_id: String,
    pub name: Option<String>,
    pub icon: Option<String>,
    pub requires_baking: bool,
    pub burns_to: Option<String>,
    pub decays_to: Option<String>,
}
