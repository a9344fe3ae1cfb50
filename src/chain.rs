//! Traversal primitives shared by the resolvers.
//!
//! The catalog relations (recipes, upgrades, cooking) are meant to be
//! acyclic but nothing enforces it, so every walk here carries a cycle
//! guard and an explicit depth ceiling instead of relying on recursion.

use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

use crate::error::Result;

/// A relation with at most one predecessor per node and any number of successors
pub trait PredecessorGraph {
    type Id: Clone + Eq + Hash;

    /// Whether the node takes part in the relation at all
    fn contains(&self, id: &Self::Id) -> Result<bool>;

    fn predecessor(&self, id: &Self::Id) -> Result<Option<Self::Id>>;

    fn successors(&self, id: &Self::Id) -> Result<Vec<Self::Id>>;
}

/// Outcome of walking predecessors up to a root
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootLookup<Id> {
    Resolved {
        root: Id,
        /// The walk stopped on a repeated node rather than a real root
        truncated_due_to_cycle: bool,
    },
    NotInGraph,
}

/// Follow predecessors from `start` until none is left or one repeats
pub fn find_root<G: PredecessorGraph>(graph: &G, start: &G::Id) -> Result<RootLookup<G::Id>> {
    if !graph.contains(start)? {
        return Ok(RootLookup::NotInGraph);
    }

    let mut visited = HashSet::from([start.clone()]);
    let mut current = start.clone();

    loop {
        match graph.predecessor(&current)? {
            None => {
                return Ok(RootLookup::Resolved {
                    root: current,
                    truncated_due_to_cycle: false,
                });
            }
            Some(parent) if visited.contains(&parent) => {
                return Ok(RootLookup::Resolved {
                    root: current,
                    truncated_due_to_cycle: true,
                });
            }
            Some(parent) => {
                visited.insert(parent.clone());
                current = parent;
            }
        }
    }
}

/// Follow the first successor from `root`. Returns the visited chain and
/// whether it ended on a repeat.
pub fn walk_forward<G: PredecessorGraph>(graph: &G, root: &G::Id) -> Result<(Vec<G::Id>, bool)> {
    let mut chain = vec![root.clone()];
    let mut visited = HashSet::from([root.clone()]);
    let mut current = root.clone();

    while let Some(next) = graph.successors(&current)?.into_iter().next() {
        if !visited.insert(next.clone()) {
            return Ok((chain, true));
        }
        chain.push(next.clone());
        current = next;
    }

    Ok((chain, false))
}

/// Breadth-first set of nodes reachable from `root`, root first
pub fn collect_reachable<G: PredecessorGraph>(graph: &G, root: &G::Id) -> Result<Vec<G::Id>> {
    let mut seen = HashSet::from([root.clone()]);
    let mut order = vec![root.clone()];
    let mut queue = VecDeque::from([root.clone()]);

    while let Some(id) = queue.pop_front() {
        for next in graph.successors(&id)? {
            if seen.insert(next.clone()) {
                order.push(next.clone());
                queue.push_back(next);
            }
        }
    }

    Ok(order)
}

/// Tree of `T` stored flat; children always sit at higher indices than their parent.
#[derive(Debug)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
}

#[derive(Debug)]
pub struct Slot<T> {
    pub value: T,
    pub parent: Option<usize>,
    pub depth: usize,
    pub children: Vec<usize>,
}

impl<T> Arena<T> {
    pub fn new(root: T) -> Self {
        Self {
            slots: vec![Slot {
                value: root,
                parent: None,
                depth: 0,
                children: Vec::new(),
            }],
        }
    }

    pub fn push(&mut self, parent: usize, value: T) -> usize {
        let idx = self.slots.len();
        let depth = self.slots[parent].depth + 1;
        self.slots.push(Slot {
            value,
            parent: Some(parent),
            depth,
            children: Vec::new(),
        });
        self.slots[parent].children.push(idx);
        idx
    }

    pub fn get(&self, idx: usize) -> &Slot<T> {
        &self.slots[idx]
    }

    pub fn get_mut(&mut self, idx: usize) -> &mut Slot<T> {
        &mut self.slots[idx]
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether any node from `idx` up to the root matches
    pub fn on_path(&self, idx: usize, mut pred: impl FnMut(&T) -> bool) -> bool {
        let mut cursor = Some(idx);
        while let Some(i) = cursor {
            let slot = &self.slots[i];
            if pred(&slot.value) {
                return true;
            }
            cursor = slot.parent;
        }
        false
    }

    /// Build nested output bottom-up without recursion
    pub fn fold<N>(self, mut build: impl FnMut(T, Vec<N>) -> N) -> N {
        let mut built: Vec<Option<N>> = (0..self.slots.len()).map(|_| None).collect();
        let mut slots: Vec<Option<Slot<T>>> = self.slots.into_iter().map(Some).collect();

        for idx in (0..slots.len()).rev() {
            let Some(slot) = slots[idx].take() else {
                continue;
            };
            let children: Vec<N> = slot
                .children
                .iter()
                .filter_map(|&child| built[child].take())
                .collect();
            let node = build(slot.value, children);
            if idx == 0 {
                return node;
            }
            built[idx] = Some(node);
        }

        // Index 0 always exists, so the loop returns before reaching here
        unreachable!("arena without root")
    }
}

/// Result of expanding a tree below a root
#[derive(Debug)]
pub struct TreeWalk<Id> {
    pub arena: Arena<Id>,
    /// A successor already on its own path was skipped
    pub cycle_cut: bool,
    /// Successors below the depth ceiling were skipped
    pub depth_cut: bool,
}

/// Expand every successor path below `root`, depth first in successor order.
///
/// Nodes reachable along two different paths appear once per path; a
/// successor that already occurs on the path leading to it is dropped.
pub fn build_tree<G: PredecessorGraph>(graph: &G, root: &G::Id, max_depth: usize) -> Result<TreeWalk<G::Id>> {
    let mut arena = Arena::new(root.clone());
    let mut cycle_cut = false;
    let mut depth_cut = false;
    let mut stack = vec![0usize];

    while let Some(idx) = stack.pop() {
        let successors = graph.successors(&arena.get(idx).value)?;
        if successors.is_empty() {
            continue;
        }
        if arena.get(idx).depth >= max_depth {
            depth_cut = true;
            continue;
        }

        let mut pushed = Vec::with_capacity(successors.len());
        for next in successors {
            if arena.on_path(idx, |id| *id == next) {
                cycle_cut = true;
                continue;
            }
            pushed.push(arena.push(idx, next));
        }
        stack.extend(pushed.into_iter().rev());
    }

    Ok(TreeWalk {
        arena,
        cycle_cut,
        depth_cut,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    /// Child -> parent edges over string ids
    struct Edges(Vec<(&'static str, &'static str)>);

    impl PredecessorGraph for Edges {
        type Id = String;

        fn contains(&self, id: &String) -> Result<bool> {
            Ok(self.0.iter().any(|(from, to)| from == id || to == id))
        }

        fn predecessor(&self, id: &String) -> Result<Option<String>> {
            Ok(self
                .0
                .iter()
                .rev()
                .find(|(_, to)| to == id)
                .map(|(from, _)| from.to_string()))
        }

        fn successors(&self, id: &String) -> Result<Vec<String>> {
            Ok(self
                .0
                .iter()
                .filter(|(from, _)| from == id)
                .map(|(_, to)| to.to_string())
                .collect())
        }
    }

    fn resolved(lookup: RootLookup<String>) -> (String, bool) {
        match lookup {
            RootLookup::Resolved {
                root,
                truncated_due_to_cycle,
            } => (root, truncated_due_to_cycle),
            RootLookup::NotInGraph => panic!("expected a root"),
        }
    }

    #[test]
    fn root_is_shared_along_a_chain() {
        let graph = Edges(vec![("a", "b"), ("b", "c")]);
        for start in ["a", "b", "c"] {
            let (root, cut) = resolved(find_root(&graph, &start.to_string()).unwrap());
            assert_eq!(root, "a");
            assert!(!cut);
        }
    }

    #[test]
    fn root_search_stops_on_cycles() {
        let graph = Edges(vec![("a", "b"), ("b", "a")]);
        let (root, cut) = resolved(find_root(&graph, &"a".to_string()).unwrap());
        assert_eq!(root, "b");
        assert!(cut);
    }

    #[test]
    fn unrelated_node_is_not_in_graph() {
        let graph = Edges(vec![("a", "b")]);
        assert_eq!(
            find_root(&graph, &"z".to_string()).unwrap(),
            RootLookup::NotInGraph
        );
    }

    #[test]
    fn forward_walk_detects_repeats() {
        let graph = Edges(vec![("a", "b"), ("b", "c"), ("c", "a")]);
        let (chain, repeated) = walk_forward(&graph, &"a".to_string()).unwrap();
        assert_eq!(chain, vec!["a", "b", "c"]);
        assert!(repeated);
    }

    #[test]
    fn reachable_is_breadth_first() {
        let graph = Edges(vec![("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")]);
        let order = collect_reachable(&graph, &"a".to_string()).unwrap();
        assert_eq!(order, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn tree_cuts_path_cycles_but_keeps_diamonds() {
        let graph = Edges(vec![("a", "b"), ("a", "c"), ("b", "d"), ("c", "d"), ("d", "a")]);
        let walk = build_tree(&graph, &"a".to_string(), 16).unwrap();
        assert!(walk.cycle_cut);
        assert!(!walk.depth_cut);

        let mut counts: HashMap<String, usize> = HashMap::new();
        for idx in 0..walk.arena.len() {
            *counts.entry(walk.arena.get(idx).value.clone()).or_default() += 1;
        }
        assert_eq!(counts["d"], 2);
        assert_eq!(counts["a"], 1);
    }

    #[test]
    fn tree_respects_depth_ceiling() {
        let graph = Edges(vec![("a", "b"), ("b", "c"), ("c", "d")]);
        let walk = build_tree(&graph, &"a".to_string(), 2).unwrap();
        assert!(walk.depth_cut);
        assert_eq!(walk.arena.len(), 3);
    }

    #[test]
    fn fold_nests_children_in_order() {
        let mut arena = Arena::new("root");
        let left = arena.push(0, "left");
        arena.push(0, "right");
        arena.push(left, "leaf");

        let rendered = arena.fold(|value, children: Vec<String>| {
            if children.is_empty() {
                value.to_string()
            } else {
                format!("{value}({})", children.join(","))
            }
        });
        assert_eq!(rendered, "root(left(leaf),right)");
    }
}
