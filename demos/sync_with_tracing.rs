//! Basic tracing integration example.
//!
//! Demonstrates initializing a subscriber so a `SyncEngine`'s `tracing`
//! events (drain start/stop, early-stop trips) are visible on stdout.

use async_trait::async_trait;
use std::sync::Arc;
use survey_sync_engine::{
    ErrorModel, InMemoryResponseStore, NoopFileSink, ResponseRecord, ResponseStore, SyncConfig,
    SyncEngine, SystemTimeProvider, Uploader,
};

struct AlwaysOkUploader;

#[async_trait]
impl Uploader for AlwaysOkUploader {
    async fn upload(&self, _record: &ResponseRecord) -> Result<(), ErrorModel> {
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing so the engine's info!/warn! events print.
    tracing_subscriber::fmt::init();

    let store = Arc::new(InMemoryResponseStore::new());
    store
        .seed((1..=3).map(|n| ResponseRecord::new(format!("response-{n}"), "farmer-1", n, "{}", vec![])))
        .await;

    let engine = SyncEngine::new(
        store,
        Arc::new(AlwaysOkUploader),
        Arc::new(NoopFileSink),
        Arc::new(SystemTimeProvider),
        SyncConfig::default(),
    );

    let result = engine.sync().await;
    println!("synced {} responses", result.succeeded.len());
}
