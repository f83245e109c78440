//! Durable response queue (spec §4.2).

mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use memory::InMemoryResponseStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteResponseStore;

use crate::error::SyncError;
use crate::record::{ResponseRecord, ResponseStatus};
use async_trait::async_trait;

/// Transactional mapping from response id to response record. All operations
/// are at-most-one-writer-at-a-time per id; writes must be observable after a
/// process restart; reads concurrent with a writer see either pre- or
/// post-state, never torn values.
#[async_trait]
pub trait ResponseStore: Send + Sync {
    /// Upserts; preserves invariants I1 (one row per id) and I5 (immutable
    /// fields unchanged on replace of an existing id).
    async fn insert_or_replace(&self, record: ResponseRecord) -> Result<(), SyncError>;

    async fn get_by_id(&self, id: &str) -> Result<Option<ResponseRecord>, SyncError>;

    /// All records with `status ∈ {Pending, FailedRetryable}`, ordered by
    /// `created_at` ascending, ties broken by `id` lexicographically.
    async fn get_pending(&self) -> Result<Vec<ResponseRecord>, SyncError>;

    /// Atomic field update; a no-op if `id` is missing.
    async fn update_status(
        &self,
        id: &str,
        status: ResponseStatus,
        retry_count: u32,
        last_attempt_at: i64,
    ) -> Result<(), SyncError>;

    /// Atomically sets `status = Synced` and clears `media_paths` (invariant I2).
    async fn mark_synced(&self, id: &str) -> Result<(), SyncError>;

    /// Deletes all rows with `status = Synced AND created_at < ts`.
    async fn delete_synced_before(&self, ts: i64) -> Result<(), SyncError>;

    /// Total row count across all statuses.
    async fn count(&self) -> Result<usize, SyncError>;
}
