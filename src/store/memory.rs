//! In-memory [`ResponseStore`] used to unit-test [`crate::SyncEngine`] in
//! isolation from real I/O, the way the teacher crate isolates policy logic
//! from transport in its own tests.

use super::ResponseStore;
use crate::error::SyncError;
use crate::record::{ResponseRecord, ResponseStatus};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub struct InMemoryResponseStore {
    rows: Mutex<HashMap<String, ResponseRecord>>,
}

impl InMemoryResponseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience for test setup: insert several records at once.
    pub async fn seed(&self, records: impl IntoIterator<Item = ResponseRecord>) {
        let mut rows = self.rows.lock().await;
        for record in records {
            rows.insert(record.id.clone(), record);
        }
    }
}

#[async_trait]
impl ResponseStore for InMemoryResponseStore {
    async fn insert_or_replace(&self, record: ResponseRecord) -> Result<(), SyncError> {
        self.rows.lock().await.insert(record.id.clone(), record);
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<ResponseRecord>, SyncError> {
        Ok(self.rows.lock().await.get(id).cloned())
    }

    async fn get_pending(&self) -> Result<Vec<ResponseRecord>, SyncError> {
        let rows = self.rows.lock().await;
        let mut pending: Vec<ResponseRecord> =
            rows.values().filter(|r| r.status.is_pending_eligible()).cloned().collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(pending)
    }

    async fn update_status(
        &self,
        id: &str,
        status: ResponseStatus,
        retry_count: u32,
        last_attempt_at: i64,
    ) -> Result<(), SyncError> {
        if let Some(record) = self.rows.lock().await.get_mut(id) {
            record.status = status;
            record.retry_count = retry_count;
            record.last_attempt_at = Some(last_attempt_at);
        }
        Ok(())
    }

    async fn mark_synced(&self, id: &str) -> Result<(), SyncError> {
        if let Some(record) = self.rows.lock().await.get_mut(id) {
            record.status = ResponseStatus::Synced;
            record.media_paths.clear();
        }
        Ok(())
    }

    async fn delete_synced_before(&self, ts: i64) -> Result<(), SyncError> {
        self.rows
            .lock()
            .await
            .retain(|_, r| !(r.status == ResponseStatus::Synced && r.created_at < ts));
        Ok(())
    }

    async fn count(&self) -> Result<usize, SyncError> {
        Ok(self.rows.lock().await.len())
    }
}
