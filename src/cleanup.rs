//! Retention-window cleanup for synced rows (spec §4.7).

use crate::clock::TimeProvider;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::store::ResponseStore;
use std::sync::Arc;

/// Deletes `Synced` rows past the retention window. Operates on a disjoint
/// row population from [`crate::SyncEngine`] (only `Synced` rows), so no
/// ordering with a concurrent `sync()` is required.
pub struct CleanupPolicy {
    store: Arc<dyn ResponseStore>,
    clock: Arc<dyn TimeProvider>,
    config: SyncConfig,
}

impl CleanupPolicy {
    pub fn new(store: Arc<dyn ResponseStore>, clock: Arc<dyn TimeProvider>, config: SyncConfig) -> Self {
        Self { store, clock, config }
    }

    /// Deletes every `Synced` row older than `retention_window_ms`. The
    /// affected-row count is implementation-defined (spec §9 open question):
    /// this crate does not surface one, so the return value carries only
    /// success/failure.
    pub async fn cleanup_old_synced(&self) -> Result<(), SyncError> {
        let cutoff = self.clock.now_millis() - self.config.retention_window_ms;
        tracing::debug!(cutoff, "running synced-row cleanup");
        self.store.delete_synced_before(cutoff).await
    }

    /// `true` once `pending_count` reaches `cleanup_threshold`. Callers decide
    /// when to invoke this and with what count; the engine does not call it.
    pub fn should_trigger_cleanup(&self, pending_count: usize) -> bool {
        pending_count >= self.config.cleanup_threshold
    }
}
