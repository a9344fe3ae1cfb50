//! Resolution errors

use thiserror::Error;

/// Which kind of catalog entry a lookup missed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Item,
    Recipe,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Item => write!(f, "item"),
            EntityKind::Recipe => write!(f, "recipe"),
        }
    }
}

/// Errors that abort a resolution.
///
/// Dangling references below the queried root never end up here; the
/// resolvers degrade on them instead.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("recipe {recipe_id} expands to {count} variants (limit {limit})")]
    TooManyVariants {
        recipe_id: String,
        count: u128,
        limit: usize,
    },

    #[error("catalog error: {0}")]
    Catalog(#[from] rusqlite::Error),
}

impl ResolveError {
    pub fn item_not_found(id: &str) -> Self {
        ResolveError::NotFound {
            kind: EntityKind::Item,
            id: id.to_string(),
        }
    }

    pub fn recipe_not_found(id: &str) -> Self {
        ResolveError::NotFound {
            kind: EntityKind::Recipe,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolveError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, ResolveError>;
