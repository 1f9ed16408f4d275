//! Swappable resolver handle for long-running callers.
//!
//! Readers take an `Arc` snapshot and keep it for a whole sweep; a new
//! mapping table is published by replacing the `Arc` in one write, so no
//! reader ever observes a half-built table.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::info;

use skumap_shared::Result;

use crate::resolver::Resolver;

/// Shared, atomically replaceable [`Resolver`].
#[derive(Debug, Default)]
pub struct SharedResolver {
    current: RwLock<Arc<Resolver>>,
}

impl SharedResolver {
    pub fn new(resolver: Resolver) -> Self {
        Self {
            current: RwLock::new(Arc::new(resolver)),
        }
    }

    /// Snapshot of the currently published resolver.
    pub fn current(&self) -> Arc<Resolver> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// Publish `resolver`, returning the one it replaced.
    pub fn replace(&self, resolver: Resolver) -> Arc<Resolver> {
        let next = Arc::new(resolver);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        info!(entries = next.len(), "publishing new mapping table");
        std::mem::replace(&mut *guard, next)
    }

    /// Validate `entries`, then publish them. On a validation error the
    /// current table stays in place.
    pub fn swap<I, K, V>(&self, entries: I) -> Result<Arc<Resolver>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let resolver = Resolver::load(entries)?;
        Ok(self.replace(resolver))
    }
}

impl From<Resolver> for SharedResolver {
    fn from(resolver: Resolver) -> Self {
        Self::new(resolver)
    }
}
