#![forbid(unsafe_code)]

//! # survey-sync-engine
//!
//! Offline-first sync engine for durable, retryable survey response uploads.
//! Field devices capture survey responses while disconnected; this crate
//! owns the queue between "captured locally" and "confirmed on the server" —
//! durable storage, retry classification, coalesced sync runs, and retention
//! cleanup. It does not capture surveys, does not speak the wire protocol to
//! the server, and does not manage media files beyond deleting them once a
//! response is confirmed synced.
//!
//! ## Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use survey_sync_engine::{
//!     FileSink, NoopFileSink, ResponseStore, SqliteResponseStore, SyncConfig, SyncEngine,
//!     SystemTimeProvider, Uploader, ErrorModel, ResponseRecord,
//! };
//! use async_trait::async_trait;
//!
//! struct HttpUploader;
//!
//! #[async_trait]
//! impl Uploader for HttpUploader {
//!     async fn upload(&self, _record: &ResponseRecord) -> Result<(), ErrorModel> {
//!         Ok(())
//!     }
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(SqliteResponseStore::open_in_memory()?);
//! let engine = SyncEngine::new(
//!     store,
//!     Arc::new(HttpUploader),
//!     Arc::new(NoopFileSink),
//!     Arc::new(SystemTimeProvider),
//!     SyncConfig::default(),
//! );
//!
//! let result = engine.sync().await;
//! println!("synced {} responses", result.succeeded.len());
//! # Ok(())
//! # }
//! ```

mod backoff;
mod clock;
mod cleanup;
mod config;
mod engine;
mod error;
mod file_sink;
mod record;
mod result;
mod store;
mod uploader;

pub use backoff::delay as backoff_delay;
pub use cleanup::CleanupPolicy;
pub use clock::{SystemTimeProvider, TimeProvider};
pub use config::SyncConfig;
pub use engine::SyncEngine;
pub use error::{ErrorModel, SyncError};
pub use file_sink::{FileSink, NoopFileSink};
pub use record::{ResponseRecord, ResponseStatus};
pub use result::{StopReason, SyncResult};
#[cfg(feature = "sqlite")]
pub use store::SqliteResponseStore;
pub use store::{InMemoryResponseStore, ResponseStore};
pub use uploader::Uploader;

pub mod prelude;
