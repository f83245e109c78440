//! Convenient re-exports for common survey-sync-engine types.
pub use crate::{
    CleanupPolicy, ErrorModel, FileSink, InMemoryResponseStore, NoopFileSink, ResponseRecord,
    ResponseStatus, ResponseStore, StopReason, SyncConfig, SyncEngine, SyncError, SyncResult,
    SystemTimeProvider, TimeProvider, Uploader,
};

#[cfg(feature = "sqlite")]
pub use crate::SqliteResponseStore;
