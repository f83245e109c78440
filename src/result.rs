//! Value objects summarising one drain (spec §4.5).

use crate::error::ErrorModel;

/// Why a drain stopped early, before exhausting the pending snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// `consecutive_failure_threshold` consecutive `Timeout` or 5xx failures.
    NetworkDegradation(u32),
    /// Unrecoverable condition for this run (`NoInternet`, or reserved for a
    /// non-retryable error were the early-stop policy ever extended to trigger on one).
    FatalError(ErrorModel),
    /// Reserved for external cancellation of the drain.
    Cancelled,
}

/// Outcome of one [`crate::SyncEngine::sync`] call.
///
/// `succeeded`, `failed`, and `pending` are disjoint; every id in the initial
/// pending snapshot appears in exactly one of them (spec P1).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncResult {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
    pub pending: Vec<String>,
    pub stop_reason: Option<StopReason>,
}

impl SyncResult {
    /// Result of a drain over an empty pending snapshot.
    pub fn empty() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_result_has_no_ids_and_no_stop_reason() {
        let result = SyncResult::empty();
        assert!(result.succeeded.is_empty());
        assert!(result.failed.is_empty());
        assert!(result.pending.is_empty());
        assert_eq!(result.stop_reason, None);
    }
}
