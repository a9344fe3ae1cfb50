//! Resolver limits and recipe selection policy

use std::fmt;
use std::str::FromStr;

pub const DEFAULT_MAX_DEPTH: usize = 64;
pub const DEFAULT_MAX_VARIANTS: usize = 4096;

/// Which concrete recipe variant the dependency builder follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VariantSelection {
    /// First variant of the first recipe, in catalog order
    #[default]
    First,
    /// Smallest total ingredient quantity, earliest on ties
    Cheapest,
    /// N-th variant across all recipes producing the item
    Index(usize),
}

impl FromStr for VariantSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(VariantSelection::First),
            "cheapest" => Ok(VariantSelection::Cheapest),
            other => other.parse::<usize>().map(VariantSelection::Index).map_err(|_| {
                format!("invalid selection '{s}': expected first, cheapest or an index")
            }),
        }
    }
}

impl fmt::Display for VariantSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantSelection::First => write!(f, "first"),
            VariantSelection::Cheapest => write!(f, "cheapest"),
            VariantSelection::Index(n) => write!(f, "{n}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Nodes deeper than this are rendered as leaves
    pub max_depth: usize,
    /// Cap on the Cartesian product of substitution groups per recipe
    pub max_variants: usize,
    pub selection: VariantSelection,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_variants: DEFAULT_MAX_VARIANTS,
            selection: VariantSelection::First,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_selection_policies() {
        assert_eq!("first".parse::<VariantSelection>(), Ok(VariantSelection::First));
        assert_eq!("Cheapest".parse::<VariantSelection>(), Ok(VariantSelection::Cheapest));
        assert_eq!("2".parse::<VariantSelection>(), Ok(VariantSelection::Index(2)));
        assert!("best".parse::<VariantSelection>().is_err());
    }
}
