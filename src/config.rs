//! Configuration surface (spec §6). A plain struct the embedding application
//! constructs directly — this is a library, there is no file-based config layer.

/// One week in milliseconds, the default `retention_window_ms`.
const ONE_WEEK_MS: i64 = 7 * 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Upper bound on `retry_count` before a record becomes `FailedPermanent`.
    pub max_retry_count: u32,
    /// Consecutive retryable failures that trip a `NetworkDegradation` early stop.
    pub consecutive_failure_threshold: u32,
    /// Base of the exponential backoff helper.
    pub initial_backoff_ms: u64,
    /// Ceiling of the backoff helper.
    pub max_backoff_ms: u64,
    /// Exponent cap for the backoff helper (`2^exponent`).
    pub max_backoff_exponent: u32,
    /// Cleanup cutoff age for `Synced` rows.
    pub retention_window_ms: i64,
    /// Pending count at or above which `should_trigger_cleanup` returns `true`.
    pub cleanup_threshold: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_retry_count: 5,
            consecutive_failure_threshold: 3,
            initial_backoff_ms: 1_000,
            max_backoff_ms: 60_000,
            max_backoff_exponent: 5,
            retention_window_ms: ONE_WEEK_MS,
            cleanup_threshold: 30,
        }
    }
}
