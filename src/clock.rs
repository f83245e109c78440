//! Time abstraction so record timestamps can be faked in tests (spec §6
//! "TimeProvider contract").

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// `now_millis() -> integer`; monotonic within a process is sufficient, wall-clock
/// alignment is not required by the contract, but a durable store spanning process
/// restarts needs timestamps that remain comparable across runs, so the production
/// implementation below is wall-clock based.
pub trait TimeProvider: Send + Sync + std::fmt::Debug {
    fn now_millis(&self) -> i64;
}

/// Production clock backed by the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

/// Deterministic clock for tests: starts at a fixed value and only advances
/// when told to, analogous to the teacher's `InstantSleeper`/`TrackingSleeper` pair.
#[derive(Debug)]
pub struct ManualTimeProvider {
    millis: AtomicI64,
}

impl ManualTimeProvider {
    pub fn new(start_millis: i64) -> Self {
        Self { millis: AtomicI64::new(start_millis) }
    }

    pub fn advance(&self, delta_millis: i64) {
        self.millis.fetch_add(delta_millis, Ordering::SeqCst);
    }

    pub fn set(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }
}

impl TimeProvider for ManualTimeProvider {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}
