//! Long-running upload session.
//!
//! An [`UploadSession`] owns the live mapping table and the last-result slot
//! for as long as its caller runs (the interactive shell holds one for the
//! whole session). Each upload resolves against the table snapshot taken
//! when it starts; a reload published mid-session applies to later uploads.

use std::sync::Arc;

use tracing::{info, instrument};

use skumap_resolver::{Resolver, SharedResolver};
use skumap_shared::Result;
use skumap_storage::Storage;
use skumap_sweep::ColumnPolicy;

use crate::pipeline::{ProgressReporter, UploadConfig, UploadResult, process_upload};
use crate::results::ResultStore;

/// Mapping table plus most recent upload, owned across many uploads.
#[derive(Debug)]
pub struct UploadSession {
    resolver: SharedResolver,
    results: ResultStore,
}

impl UploadSession {
    pub fn new(resolver: Resolver) -> Self {
        Self {
            resolver: SharedResolver::new(resolver),
            results: ResultStore::new(),
        }
    }

    /// Snapshot of the current mapping table.
    pub fn resolver(&self) -> Arc<Resolver> {
        self.resolver.current()
    }

    /// Validate and publish a new mapping table. On error the current table
    /// stays in place.
    pub fn reload<I, K, V>(&self, entries: I) -> Result<Arc<Resolver>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.resolver.swap(entries)?;
        Ok(self.resolver.current())
    }

    /// Run one upload against the current table and keep its result as the
    /// latest.
    #[instrument(skip_all, fields(generation = self.results.generation() + 1))]
    pub async fn ingest(
        &mut self,
        config: &UploadConfig,
        policy: &dyn ColumnPolicy,
        storage: Option<&Storage>,
        progress: &dyn ProgressReporter,
    ) -> Result<Arc<UploadResult>> {
        let resolver = self.resolver.current();
        let result = process_upload(config, &resolver, policy, storage, progress).await?;
        let stored = self.results.replace(result);
        info!(files = stored.files.len(), "session result updated");
        Ok(stored)
    }

    /// The most recent upload of this session, if any.
    pub fn latest(&self) -> Option<Arc<UploadResult>> {
        self.results.latest()
    }

    /// Number of uploads stored so far.
    pub fn generation(&self) -> u64 {
        self.results.generation()
    }
}
