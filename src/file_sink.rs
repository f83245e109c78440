//! File deletion collaborator interface (spec §4.6). Best-effort; never fails
//! the enclosing sync.

use async_trait::async_trait;

#[async_trait]
pub trait FileSink: Send + Sync {
    /// Attempts to delete every path. Returns the count actually removed.
    /// Per-file errors and existence checks are opaque to the engine.
    async fn delete_files(&self, paths: &[String]) -> usize;
}

/// Default sink for callers with no media to manage.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopFileSink;

#[async_trait]
impl FileSink for NoopFileSink {
    async fn delete_files(&self, paths: &[String]) -> usize {
        paths.len()
    }
}
