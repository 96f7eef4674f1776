//! Lazily fetched collections.
//!
//! A roster on a [`Movie`](crate::Movie) is either `Unloaded` (the store never
//! fetched it) or `Loaded`. Reconciling an unloaded roster would silently treat
//! every persisted row as obsolete, so all mutable access goes through
//! [`Collection::require_mut`], which refuses unloaded collections.

use crate::error::{CatalogError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Collection<T> {
    Unloaded,
    Loaded(Vec<T>),
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Collection::Unloaded
    }
}

impl<T> Collection<T> {
    pub fn loaded(items: Vec<T>) -> Self {
        Collection::Loaded(items)
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Collection::Loaded(_))
    }

    pub fn items(&self) -> Option<&[T]> {
        match self {
            Collection::Loaded(items) => Some(items.as_slice()),
            Collection::Unloaded => None,
        }
    }

    pub fn items_mut(&mut self) -> Option<&mut Vec<T>> {
        match self {
            Collection::Loaded(items) => Some(items),
            Collection::Unloaded => None,
        }
    }

    /// Read access, failing with `UninitializedCollection` when never fetched
    pub fn require(&self, name: &str) -> Result<&[T]> {
        self.items().ok_or_else(|| CatalogError::uninitialized(name))
    }

    /// Mutable access, failing with `UninitializedCollection` when never fetched
    pub fn require_mut(&mut self, name: &str) -> Result<&mut Vec<T>> {
        self.items_mut().ok_or_else(|| CatalogError::uninitialized(name))
    }
}
