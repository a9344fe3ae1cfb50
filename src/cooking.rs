//! Cook / burn / decay transformation chains

use tracing::warn;

use crate::catalog::Catalog;
use crate::chain::{self, PredecessorGraph, RootLookup};
use crate::error::{ResolveError, Result};
use crate::models::{CookingChain, LinkedItem};

/// The `cooked_to` relation, read from the catalog on demand
struct CookingGraph<'a, C> {
    catalog: &'a C,
}

impl<C: Catalog> PredecessorGraph for CookingGraph<'_, C> {
    type Id = String;

    fn contains(&self, id: &String) -> Result<bool> {
        if self.catalog.get_transformation(id)?.cooked_to.is_some() {
            return Ok(true);
        }
        Ok(self.catalog.find_cooked_from(id)?.is_some())
    }

    fn predecessor(&self, id: &String) -> Result<Option<String>> {
        self.catalog.find_cooked_from(id)
    }

    fn successors(&self, id: &String) -> Result<Vec<String>> {
        Ok(self.catalog.get_transformation(id)?.cooked_to.into_iter().collect())
    }
}

/// The cooking chain containing `item_id`, raw form first.
///
/// Only `cooked_to` links form the chain; burn and decay targets are
/// reported on each step but never ordered into it. An item with no
/// cooking relation yields an empty chain.
pub fn cooking_chain(catalog: &impl Catalog, item_id: &str) -> Result<CookingChain> {
    if catalog.get_item(item_id)?.is_none() {
        return Err(ResolveError::item_not_found(item_id));
    }

    let graph = CookingGraph { catalog };
    let (root, root_cycle) = match chain::find_root(&graph, &item_id.to_string())? {
        RootLookup::NotInGraph => {
            return Ok(CookingChain {
                steps: Vec::new(),
                truncated_due_to_cycle: false,
            });
        }
        RootLookup::Resolved {
            root,
            truncated_due_to_cycle,
        } => (root, truncated_due_to_cycle),
    };

    let (ids, forward_cycle) = chain::walk_forward(&graph, &root)?;
    let truncated_due_to_cycle = root_cycle || forward_cycle;
    if truncated_due_to_cycle {
        warn!(item = %item_id, root = %root, "cooking cycle truncated");
    }
    if ids.len() <= 1 {
        return Ok(CookingChain {
            steps: Vec::new(),
            truncated_due_to_cycle,
        });
    }

    let items = catalog.get_items(&ids)?;
    let mut steps = Vec::with_capacity(ids.len());
    for id in ids {
        let transformation = catalog.get_transformation(&id)?;
        let item = items.get(&id);
        steps.push(LinkedItem {
            name: item.map(|i| i.name.clone()),
            icon: item.and_then(|i| i.icon.clone()),
            requires_baking: transformation.requires_baking,
            burns_to: transformation.burned_to,
            decays_to: transformation.decayed_to,
            item_id: id,
        });
    }

    Ok(CookingChain {
        steps,
        truncated_due_to_cycle,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SqliteCatalog;
    use crate::db;
    use crate::models::Transformation;
    use crate::test_utils::*;

    fn chain_ids(chain: &CookingChain) -> Vec<&str> {
        chain.steps.iter().map(|s| s.item_id.as_str()).collect()
    }

    fn meat_catalog() -> rusqlite::Connection {
        let conn = memory_db();
        for id in ["raw_meat", "cooked_meat", "burnt_meat", "rotten_meat", "pebble"] {
            add_item(&conn, id);
        }
        add_transformation(&conn, "raw_meat", Some("cooked_meat"), Some("burnt_meat"), Some("rotten_meat"));
        add_transformation(&conn, "cooked_meat", None, Some("burnt_meat"), Some("rotten_meat"));
        conn
    }

    #[test]
    fn chain_runs_raw_to_cooked() {
        let conn = meat_catalog();
        let catalog = SqliteCatalog::new(&conn);

        let from_cooked = cooking_chain(&catalog, "cooked_meat").unwrap();
        assert_eq!(chain_ids(&from_cooked), vec!["raw_meat", "cooked_meat"]);
        assert!(!from_cooked.truncated_due_to_cycle);

        let from_raw = cooking_chain(&catalog, "raw_meat").unwrap();
        assert_eq!(from_raw, from_cooked);
    }

    #[test]
    fn side_branches_stay_out_of_the_order() {
        let conn = meat_catalog();
        let catalog = SqliteCatalog::new(&conn);

        let chain = cooking_chain(&catalog, "raw_meat").unwrap();
        assert_eq!(chain.steps[0].burns_to.as_deref(), Some("burnt_meat"));
        assert_eq!(chain.steps[1].decays_to.as_deref(), Some("rotten_meat"));
        assert_eq!(chain.steps[0].name.as_deref(), Some("RAW_MEAT"));

        assert!(cooking_chain(&catalog, "burnt_meat").unwrap().steps.is_empty());
    }

    #[test]
    fn uncookable_item_has_empty_chain() {
        let conn = meat_catalog();
        let catalog = SqliteCatalog::new(&conn);

        assert!(cooking_chain(&catalog, "pebble").unwrap().steps.is_empty());
    }

    #[test]
    fn unknown_item_is_not_found() {
        let conn = meat_catalog();
        let catalog = SqliteCatalog::new(&conn);

        assert!(cooking_chain(&catalog, "dragon_steak").unwrap_err().is_not_found());
    }

    #[test]
    fn longer_chains_and_baking_flags() {
        let conn = memory_db();
        for id in ["dough", "bread", "toast"] {
            add_item(&conn, id);
        }
        db::upsert_transformation(
            &conn,
            &Transformation {
                item_id: "dough".into(),
                cooked_to: Some("bread".into()),
                requires_baking: true,
                ..Default::default()
            },
        )
        .unwrap();
        add_transformation(&conn, "bread", Some("toast"), None, None);
        let catalog = SqliteCatalog::new(&conn);

        let chain = cooking_chain(&catalog, "toast").unwrap();
        assert_eq!(chain_ids(&chain), vec!["dough", "bread", "toast"]);
        assert!(chain.steps[0].requires_baking);
        assert!(!chain.steps[1].requires_baking);
    }

    #[test]
    fn shared_cooked_form_walks_back_to_the_lowest_id() {
        let conn = memory_db();
        for id in ["b_fish", "a_fish", "grilled_fish"] {
            add_item(&conn, id);
        }
        add_transformation(&conn, "b_fish", Some("grilled_fish"), None, None);
        add_transformation(&conn, "a_fish", Some("grilled_fish"), None, None);
        let catalog = SqliteCatalog::new(&conn);

        let from_cooked = cooking_chain(&catalog, "grilled_fish").unwrap();
        assert_eq!(chain_ids(&from_cooked), vec!["a_fish", "grilled_fish"]);

        let from_other_raw = cooking_chain(&catalog, "b_fish").unwrap();
        assert_eq!(chain_ids(&from_other_raw), vec!["b_fish", "grilled_fish"]);
    }

    #[test]
    fn cyclic_chain_terminates() {
        let conn = memory_db();
        add_item(&conn, "ice");
        add_item(&conn, "water");
        add_transformation(&conn, "ice", Some("water"), None, None);
        add_transformation(&conn, "water", Some("ice"), None, None);
        let catalog = SqliteCatalog::new(&conn);

        let chain = cooking_chain(&catalog, "ice").unwrap();
        assert!(chain.truncated_due_to_cycle);
        assert_eq!(chain.steps.len(), 2);
    }
}
