//! The durable unit of work: one survey submission.

use serde::{Deserialize, Serialize};

/// Status of a [`ResponseRecord`]. `Synced` and `FailedPermanent` are terminal —
/// no further transition is permitted out of them (invariant I6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseStatus {
    Pending,
    Synced,
    FailedRetryable,
    FailedPermanent,
}

impl ResponseStatus {
    /// `true` for the two statuses `get_pending` selects.
    pub fn is_pending_eligible(&self) -> bool {
        matches!(self, ResponseStatus::Pending | ResponseStatus::FailedRetryable)
    }

    /// `true` for `Synced` / `FailedPermanent`; no mutator may transition out of these.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ResponseStatus::Synced | ResponseStatus::FailedPermanent)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseStatus::Pending => "PENDING",
            ResponseStatus::Synced => "SYNCED",
            ResponseStatus::FailedRetryable => "FAILED_RETRYABLE",
            ResponseStatus::FailedPermanent => "FAILED_PERMANENT",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "PENDING" => Some(ResponseStatus::Pending),
            "SYNCED" => Some(ResponseStatus::Synced),
            "FAILED_RETRYABLE" => Some(ResponseStatus::FailedRetryable),
            "FAILED_PERMANENT" => Some(ResponseStatus::FailedPermanent),
            _ => None,
        }
    }
}

/// One row: a single survey submission and its sync state.
///
/// `id`, `farmer_id`, `created_at`, `answers_json` are immutable after insert
/// (invariant I5). `status`, `retry_count`, `last_attempt_at`, and `media_paths`
/// are mutated only by [`crate::SyncEngine`] and [`crate::CleanupPolicy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub id: String,
    pub farmer_id: String,
    /// Monotonic millisecond timestamp; the queue ordering key.
    pub created_at: i64,
    /// Opaque UTF-8 payload, uploaded verbatim. The engine never parses this.
    pub answers_json: String,
    pub status: ResponseStatus,
    pub retry_count: u32,
    pub last_attempt_at: Option<i64>,
    pub media_paths: Vec<String>,
}

impl ResponseRecord {
    /// Construct a fresh record in `Pending` with no attempts yet (the only
    /// state external callers — the survey capture layer — are permitted to create).
    pub fn new(
        id: impl Into<String>,
        farmer_id: impl Into<String>,
        created_at: i64,
        answers_json: impl Into<String>,
        media_paths: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            farmer_id: farmer_id.into(),
            created_at,
            answers_json: answers_json.into(),
            status: ResponseStatus::Pending,
            retry_count: 0,
            last_attempt_at: None,
            media_paths,
        }
    }
}
