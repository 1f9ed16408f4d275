//! Last-upload result slot.
//!
//! A caller that needs "the most recent results" (a report view, a status
//! line) owns a [`ResultStore`] and hands each new [`UploadResult`] to it.
//! Writes take `&mut self`, so there is exactly one writer; every new upload
//! overwrites the previous one. Readers get an `Arc` and keep whatever they
//! read even after the next replacement.

use std::sync::Arc;

use crate::pipeline::UploadResult;

/// Single-slot store of the most recent upload result.
#[derive(Debug, Default)]
pub struct ResultStore {
    latest: Option<Arc<UploadResult>>,
    generation: u64,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `result`, replacing any previous one. Returns the stored handle.
    pub fn replace(&mut self, result: UploadResult) -> Arc<UploadResult> {
        let result = Arc::new(result);
        self.latest = Some(Arc::clone(&result));
        self.generation += 1;
        result
    }

    /// The most recent result, if any upload has been stored.
    pub fn latest(&self) -> Option<Arc<UploadResult>> {
        self.latest.clone()
    }

    /// Number of results stored so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
