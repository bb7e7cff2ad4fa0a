//! # Registries
//!
//! Provider specific overrides ([`SpecificFunction`]) and post execution filters
//! ([`DataFilter`]) are registered by the hosting application and read by the dispatcher
//! on every call through a [`Source`].
//!
//! The dispatcher never caches what it reads: each call takes a fresh snapshot, so items
//! registered (or replaced) after the dispatcher was built are visible on the next call.

use std::sync::{Arc, PoisonError, RwLock};

use crate::provider;

mod specific;
pub use specific::*;

mod filter;
pub use filter::*;

#[derive(thiserror::Error, Debug)]
pub enum FunctionError {
    #[error(transparent)]
    Provider(#[from] provider::Error),
    #[error("{0}")]
    Failed(String),
}

/// Anything able to produce the current set of registered items.
pub trait Source<T: ?Sized>: Send + Sync {
    fn snapshot(&self) -> Vec<Arc<T>>;
}

/// Hot-swappable list of registered items.
///
/// Readers clone an `Arc` to the current list, writers swap the list as a whole, so a
/// snapshot is never affected by later registrations.
pub struct Registry<T: ?Sized> {
    items: RwLock<Arc<Vec<Arc<T>>>>,
}

impl<T: ?Sized> Default for Registry<T> {
    fn default() -> Self {
        Self {
            items: RwLock::new(Arc::new(Vec::new())),
        }
    }
}

impl<T: ?Sized> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an item, registration order is preserved.
    pub fn register(&self, item: Arc<T>) {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = Vec::with_capacity(items.len() + 1);
        next.extend(items.iter().cloned());
        next.push(item);
        *items = Arc::new(next);
    }

    /// Replaces the whole registered set.
    pub fn replace(&self, new_items: Vec<Arc<T>>) {
        *self.items.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(new_items);
    }

    pub fn clear(&self) {
        self.replace(Vec::new());
    }

    pub fn len(&self) -> usize {
        self.current().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current().is_empty()
    }

    fn current(&self) -> Arc<Vec<Arc<T>>> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<T> Source<T> for Registry<T>
where
    T: ?Sized + Send + Sync,
{
    fn snapshot(&self) -> Vec<Arc<T>> {
        self.current().as_ref().clone()
    }
}

pub type OverrideRegistry = Registry<dyn SpecificFunction>;
pub type FilterRegistry = Registry<dyn DataFilter>;
