//! Sync orchestrator (spec §4.4) and single-flight coalescing gate (spec §5).

use crate::backoff;
use crate::clock::TimeProvider;
use crate::config::SyncConfig;
use crate::error::ErrorModel;
use crate::file_sink::FileSink;
use crate::record::{ResponseRecord, ResponseStatus};
use crate::result::{StopReason, SyncResult};
use crate::store::ResponseStore;
use crate::uploader::Uploader;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;

struct EngineInner {
    store: Arc<dyn ResponseStore>,
    uploader: Arc<dyn Uploader>,
    file_sink: Arc<dyn FileSink>,
    clock: Arc<dyn TimeProvider>,
    config: SyncConfig,
    inflight: AsyncMutex<Option<Shared<BoxFuture<'static, SyncResult>>>>,
}

/// Orchestrates a drain of the pending queue. Cheap to clone (internally
/// `Arc`-backed, like the teacher's `RetryPolicy`/`CircuitBreakerPolicy`) and
/// constructed with all of its collaborators — no process-wide singleton.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<EngineInner>,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn ResponseStore>,
        uploader: Arc<dyn Uploader>,
        file_sink: Arc<dyn FileSink>,
        clock: Arc<dyn TimeProvider>,
        config: SyncConfig,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                store,
                uploader,
                file_sink,
                clock,
                config,
                inflight: AsyncMutex::new(None),
            }),
        }
    }

    /// The advisory backoff helper (spec §4.4.5), bound to this engine's config.
    /// Not consulted by `sync()` itself — an external scheduler's concern.
    pub fn backoff_delay(&self, retry_count: u32) -> Duration {
        backoff::delay(retry_count, &self.inner.config)
    }

    /// Runs one drain, or attaches to an already in-flight drain and returns
    /// its result. Every coalesced caller receives an identical `SyncResult`
    /// (spec §5 point 4).
    pub async fn sync(&self) -> SyncResult {
        let shared = {
            let mut guard = self.inner.inflight.lock().await;
            match guard.as_ref() {
                Some(existing) => existing.clone(),
                None => {
                    let engine = self.clone();
                    let fut: BoxFuture<'static, SyncResult> =
                        Box::pin(async move { engine.drain().await });
                    let shared = fut.shared();
                    *guard = Some(shared.clone());
                    shared
                }
            }
        };

        let result = shared.clone().await;

        // Double-check: only clear the slot if nobody raced us into starting
        // a fresh drain after this one completed.
        let mut guard = self.inner.inflight.lock().await;
        if let Some(current) = guard.as_ref() {
            if current.ptr_eq(&shared) {
                *guard = None;
            }
        }

        result
    }

    async fn drain(&self) -> SyncResult {
        let pending = match self.inner.store.get_pending().await {
            Ok(pending) => pending,
            Err(err) => {
                tracing::warn!(error = %err, "get_pending failed; aborting drain");
                return SyncResult {
                    succeeded: Vec::new(),
                    failed: Vec::new(),
                    pending: Vec::new(),
                    stop_reason: Some(StopReason::FatalError(ErrorModel::Unknown(Some(
                        err.to_string(),
                    )))),
                };
            }
        };

        if pending.is_empty() {
            return SyncResult::empty();
        }

        tracing::info!(count = pending.len(), "starting drain");

        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        let mut remaining: Vec<String> = pending.iter().map(|r| r.id.clone()).collect();
        let mut consecutive: u32 = 0;
        let mut stop: Option<StopReason> = None;

        for record in pending {
            remaining.retain(|id| id != &record.id);

            match self.inner.uploader.upload(&record).await {
                Ok(()) => {
                    if let Err(err) = self.inner.store.mark_synced(&record.id).await {
                        tracing::warn!(id = %record.id, error = %err, "mark_synced failed; aborting drain");
                        remaining.insert(0, record.id.clone());
                        stop = Some(StopReason::FatalError(ErrorModel::Unknown(Some(err.to_string()))));
                        break;
                    }

                    if !record.media_paths.is_empty() {
                        let deleted = self.inner.file_sink.delete_files(&record.media_paths).await;
                        if deleted < record.media_paths.len() {
                            tracing::warn!(
                                id = %record.id,
                                deleted,
                                total = record.media_paths.len(),
                                "media cleanup incomplete; not treated as a sync failure"
                            );
                        }
                    }

                    succeeded.push(record.id.clone());
                    consecutive = 0;
                }
                Err(err) => {
                    let retryable = err.is_retryable();
                    let new_retry_count = record.retry_count + 1;
                    let new_status = if !retryable || new_retry_count >= self.inner.config.max_retry_count
                    {
                        ResponseStatus::FailedPermanent
                    } else {
                        ResponseStatus::FailedRetryable
                    };
                    let now = self.inner.clock.now_millis();

                    if let Err(store_err) = self
                        .inner
                        .store
                        .update_status(&record.id, new_status, new_retry_count, now)
                        .await
                    {
                        tracing::warn!(id = %record.id, error = %store_err, "update_status failed; aborting drain");
                        remaining.insert(0, record.id.clone());
                        stop = Some(StopReason::FatalError(ErrorModel::Unknown(Some(
                            store_err.to_string(),
                        ))));
                        break;
                    }

                    failed.push(record.id.clone());
                    consecutive = if retryable { consecutive + 1 } else { 0 };

                    if let Some(reason) = early_stop(&err, consecutive, &self.inner.config) {
                        tracing::info!(?reason, "early stop triggered");
                        stop = Some(reason);
                        break;
                    }
                }
            }
        }

        tracing::info!(
            succeeded = succeeded.len(),
            failed = failed.len(),
            pending = remaining.len(),
            stopped_early = stop.is_some(),
            "drain finished"
        );

        SyncResult { succeeded, failed, pending: remaining, stop_reason: stop }
    }
}

/// Early-stop policy (spec §4.4.4). Only ever consulted right after a failed
/// attempt, with `consecutive` already incremented for this failure.
fn early_stop(error: &ErrorModel, consecutive: u32, config: &SyncConfig) -> Option<StopReason> {
    match error {
        ErrorModel::NoInternet => Some(StopReason::FatalError(ErrorModel::NoInternet)),
        ErrorModel::Timeout if consecutive >= config.consecutive_failure_threshold => {
            Some(StopReason::NetworkDegradation(consecutive))
        }
        ErrorModel::ServerError(code, _)
            if (500..=599).contains(code) && consecutive >= config.consecutive_failure_threshold =>
        {
            Some(StopReason::NetworkDegradation(consecutive))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualTimeProvider;
    use crate::file_sink::test_support::TrackingFileSink;
    use crate::file_sink::NoopFileSink;
    use crate::store::InMemoryResponseStore;
    use crate::uploader::test_support::ScriptedUploader;
    use std::collections::HashSet;

    fn record(id: &str, created_at: i64) -> ResponseRecord {
        ResponseRecord::new(id, "farmer-1", created_at, "{}", vec![])
    }

    fn engine_with(
        store: Arc<InMemoryResponseStore>,
        uploader: Arc<ScriptedUploader>,
        config: SyncConfig,
    ) -> SyncEngine {
        SyncEngine::new(
            store,
            uploader,
            Arc::new(NoopFileSink),
            Arc::new(ManualTimeProvider::new(1_000)),
            config,
        )
    }

    #[tokio::test]
    async fn all_succeed() {
        let store = Arc::new(InMemoryResponseStore::new());
        store.seed((1..=5).map(|n| record(&format!("response-{n}"), n))).await;
        let uploader = Arc::new(ScriptedUploader::always_ok());
        let engine = engine_with(store.clone(), uploader, SyncConfig::default());

        let result = engine.sync().await;

        assert_eq!(
            result.succeeded,
            vec!["response-1", "response-2", "response-3", "response-4", "response-5"]
        );
        assert!(result.failed.is_empty());
        assert!(result.pending.is_empty());
        assert_eq!(result.stop_reason, None);

        for n in 1..=5 {
            let id = format!("response-{n}");
            let fetched = store.get_by_id(&id).await.unwrap().unwrap();
            assert_eq!(fetched.status, ResponseStatus::Synced);
        }
    }

    #[tokio::test]
    async fn partial_failure_with_early_stop_at_threshold_one() {
        let store = Arc::new(InMemoryResponseStore::new());
        store.seed((1..=8).map(|n| record(&format!("response-{n}"), n))).await;

        let outcomes = (1..=8)
            .map(|n| if n == 6 { Err(ErrorModel::ServerError(500, None)) } else { Ok(()) })
            .collect();
        let uploader = Arc::new(ScriptedUploader::new(outcomes));
        let config = SyncConfig { consecutive_failure_threshold: 1, ..SyncConfig::default() };
        let engine = engine_with(store.clone(), uploader, config);

        let result = engine.sync().await;

        assert_eq!(
            result.succeeded,
            vec!["response-1", "response-2", "response-3", "response-4", "response-5"]
        );
        assert_eq!(result.failed, vec!["response-6"]);
        assert_eq!(result.pending, vec!["response-7", "response-8"]);
        assert_eq!(result.stop_reason, Some(StopReason::NetworkDegradation(1)));

        let row = store.get_by_id("response-6").await.unwrap().unwrap();
        assert_eq!(row.status, ResponseStatus::FailedRetryable);
        assert_eq!(row.retry_count, 1);
    }

    #[tokio::test]
    async fn immediate_fatal_stop_on_no_internet() {
        let store = Arc::new(InMemoryResponseStore::new());
        store.seed((1..=5).map(|n| record(&format!("response-{n}"), n))).await;

        let outcomes = vec![Ok(()), Ok(()), Err(ErrorModel::NoInternet)];
        let uploader = Arc::new(ScriptedUploader::new(outcomes));
        let engine = engine_with(store.clone(), uploader, SyncConfig::default());

        let result = engine.sync().await;

        assert_eq!(result.succeeded, vec!["response-1", "response-2"]);
        assert_eq!(result.failed, vec!["response-3"]);
        assert_eq!(result.pending, vec!["response-4", "response-5"]);
        assert_eq!(result.stop_reason, Some(StopReason::FatalError(ErrorModel::NoInternet)));
    }

    #[tokio::test]
    async fn non_retryable_error_goes_straight_to_permanent_and_stays_there() {
        let store = Arc::new(InMemoryResponseStore::new());
        store.seed([record("response-1", 1)]).await;

        let uploader = Arc::new(ScriptedUploader::new(vec![Err(ErrorModel::ServerError(400, None))]));
        let engine = engine_with(store.clone(), uploader, SyncConfig::default());

        engine.sync().await;

        let row = store.get_by_id("response-1").await.unwrap().unwrap();
        assert_eq!(row.status, ResponseStatus::FailedPermanent);
        assert_eq!(row.retry_count, 1);

        let uploader2 = Arc::new(ScriptedUploader::always_ok());
        let engine2 = engine_with(store.clone(), uploader2.clone(), SyncConfig::default());
        engine2.sync().await;

        assert_eq!(uploader2.call_count(), 0, "a FailedPermanent record must never be uploaded again");
    }

    #[tokio::test]
    async fn retry_exhaustion_reaches_failed_permanent() {
        let store = Arc::new(InMemoryResponseStore::new());
        let mut rec = record("response-1", 1);
        rec.status = ResponseStatus::FailedRetryable;
        rec.retry_count = 4;
        store.seed([rec]).await;

        let config = SyncConfig { max_retry_count: 5, ..SyncConfig::default() };
        let uploader = Arc::new(ScriptedUploader::new(vec![Err(ErrorModel::ServerError(500, None))]));
        let engine = engine_with(store.clone(), uploader, config);

        engine.sync().await;

        let row = store.get_by_id("response-1").await.unwrap().unwrap();
        assert_eq!(row.status, ResponseStatus::FailedPermanent);
        assert_eq!(row.retry_count, 5);
    }

    #[tokio::test]
    async fn empty_pending_set_returns_empty_without_uploading() {
        let store = Arc::new(InMemoryResponseStore::new());
        let uploader = Arc::new(ScriptedUploader::always_ok());
        let engine = engine_with(store, uploader.clone(), SyncConfig::default());

        let result = engine.sync().await;

        assert_eq!(result, SyncResult::empty());
        assert_eq!(uploader.call_count(), 0);
    }

    #[tokio::test]
    async fn only_failed_permanent_rows_produce_empty_result_and_no_uploads() {
        let store = Arc::new(InMemoryResponseStore::new());
        let mut rec = record("response-1", 1);
        rec.status = ResponseStatus::FailedPermanent;
        rec.retry_count = 5;
        store.seed([rec]).await;

        let uploader = Arc::new(ScriptedUploader::always_ok());
        let engine = engine_with(store, uploader.clone(), SyncConfig::default());

        let result = engine.sync().await;

        assert_eq!(result, SyncResult::empty());
        assert_eq!(uploader.call_count(), 0);
    }

    #[tokio::test]
    async fn consecutive_counter_resets_on_success_between_failures() {
        let store = Arc::new(InMemoryResponseStore::new());
        store.seed((1..=4).map(|n| record(&format!("response-{n}"), n))).await;

        // fail, succeed, fail, fail -> with threshold 2 the run should only stop
        // after the third record's *second* consecutive failure, i.e. at record 4.
        let outcomes = vec![
            Err(ErrorModel::Timeout),
            Ok(()),
            Err(ErrorModel::Timeout),
            Err(ErrorModel::Timeout),
        ];
        let uploader = Arc::new(ScriptedUploader::new(outcomes));
        let config = SyncConfig { consecutive_failure_threshold: 2, ..SyncConfig::default() };
        let engine = engine_with(store.clone(), uploader, config);

        let result = engine.sync().await;

        assert_eq!(result.failed, vec!["response-1", "response-3", "response-4"]);
        assert_eq!(result.stop_reason, Some(StopReason::NetworkDegradation(2)));
    }

    #[tokio::test]
    async fn media_paths_are_deleted_on_success() {
        let store = Arc::new(InMemoryResponseStore::new());
        let mut rec = record("response-1", 1);
        rec.media_paths = vec!["a.jpg".to_string(), "b.jpg".to_string()];
        store.seed([rec]).await;

        let uploader = Arc::new(ScriptedUploader::always_ok());
        let file_sink = Arc::new(TrackingFileSink::new());
        let engine = SyncEngine::new(
            store.clone(),
            uploader,
            file_sink.clone(),
            Arc::new(ManualTimeProvider::new(0)),
            SyncConfig::default(),
        );

        engine.sync().await;

        assert_eq!(file_sink.batches(), vec![vec!["a.jpg".to_string(), "b.jpg".to_string()]]);
    }

    #[tokio::test]
    async fn concurrent_callers_coalesce_onto_one_drain() {
        struct SlowUploader {
            inner: ScriptedUploader,
        }

        #[async_trait::async_trait]
        impl Uploader for SlowUploader {
            async fn upload(&self, record: &ResponseRecord) -> Result<(), ErrorModel> {
                tokio::time::sleep(Duration::from_millis(50)).await;
                self.inner.upload(record).await
            }
        }

        let store = Arc::new(InMemoryResponseStore::new());
        store.seed((1..=3).map(|n| record(&format!("response-{n}"), n))).await;

        let uploader = Arc::new(SlowUploader { inner: ScriptedUploader::always_ok() });
        let uploader_check = uploader.clone();
        let engine = SyncEngine::new(
            store.clone(),
            uploader,
            Arc::new(NoopFileSink),
            Arc::new(ManualTimeProvider::new(0)),
            SyncConfig::default(),
        );

        let engine2 = engine.clone();
        let first = tokio::spawn(async move { engine.sync().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = tokio::spawn(async move { engine2.sync().await });

        let (r1, r2) = tokio::join!(first, second);
        let r1 = r1.unwrap();
        let r2 = r2.unwrap();

        assert_eq!(r1, r2);
        assert_eq!(
            r1.succeeded.iter().cloned().collect::<HashSet<_>>(),
            ["response-1", "response-2", "response-3"]
                .into_iter()
                .map(String::from)
                .collect::<HashSet<_>>()
        );
        assert_eq!(
            uploader_check.inner.call_count(),
            3,
            "a broken single-flight gate would let a second drain upload the same 3 records again"
        );
    }

    #[tokio::test]
    async fn sequential_drains_after_completion_start_fresh() {
        let store = Arc::new(InMemoryResponseStore::new());
        store.seed([record("response-1", 1)]).await;
        let uploader = Arc::new(ScriptedUploader::always_ok());
        let engine = engine_with(store.clone(), uploader.clone(), SyncConfig::default());

        let first = engine.sync().await;
        assert_eq!(first.succeeded, vec!["response-1"]);

        store.seed([record("response-2", 2)]).await;
        let second = engine.sync().await;
        assert_eq!(second.succeeded, vec!["response-2"]);
    }
}
