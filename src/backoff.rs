//! Advisory backoff helper (spec §4.4.5).
//!
//! `delay(n)` is a pure function of the record's post-attempt `retry_count`; the
//! drain itself never sleeps (see Design Notes — the source this spec was
//! distilled from computes backoff but never applies it inside the sync loop).
//! This is exposed for an external scheduler to consult, not invoked by
//! [`crate::SyncEngine::drain`].

use crate::config::SyncConfig;
use std::time::Duration;

/// `delay(n) = min(initial_backoff_ms * 2^min(n, max_backoff_exponent), max_backoff_ms)`
pub fn delay(n: u32, config: &SyncConfig) -> Duration {
    let exponent = n.min(config.max_backoff_exponent);
    let multiplier = 2u64.saturating_pow(exponent);
    let scaled = config.initial_backoff_ms.saturating_mul(multiplier);
    Duration::from_millis(scaled.min(config.max_backoff_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SyncConfig {
        SyncConfig {
            initial_backoff_ms: 1_000,
            max_backoff_ms: 60_000,
            max_backoff_exponent: 5,
            ..SyncConfig::default()
        }
    }

    #[test]
    fn n_zero_is_base_delay() {
        assert_eq!(delay(0, &config()), Duration::from_millis(1_000));
    }

    #[test]
    fn doubles_per_attempt_up_to_cap_exponent() {
        let cfg = config();
        assert_eq!(delay(1, &cfg), Duration::from_millis(2_000));
        assert_eq!(delay(2, &cfg), Duration::from_millis(4_000));
        assert_eq!(delay(3, &cfg), Duration::from_millis(8_000));
        assert_eq!(delay(4, &cfg), Duration::from_millis(16_000));
    }

    #[test]
    fn at_max_backoff_exponent() {
        // 1000 * 2^5 = 32000, below the 60000 ceiling.
        assert_eq!(delay(5, &config()), Duration::from_millis(32_000));
    }

    #[test]
    fn beyond_cap_exponent_does_not_grow_further() {
        let cfg = config();
        let at_cap = delay(5, &cfg);
        assert_eq!(delay(6, &cfg), at_cap);
        assert_eq!(delay(100, &cfg), at_cap);
    }

    #[test]
    fn respects_max_backoff_ms_ceiling() {
        let cfg = SyncConfig {
            initial_backoff_ms: 10_000,
            max_backoff_ms: 15_000,
            max_backoff_exponent: 5,
            ..SyncConfig::default()
        };
        // 10000 * 2^1 = 20000, clamped to 15000.
        assert_eq!(delay(1, &cfg), Duration::from_millis(15_000));
    }

    #[test]
    fn does_not_overflow_with_large_exponent_cap() {
        let cfg = SyncConfig {
            initial_backoff_ms: u64::MAX / 2,
            max_backoff_ms: u64::MAX,
            max_backoff_exponent: 63,
            ..SyncConfig::default()
        };
        // Should saturate rather than panic.
        let d = delay(63, &cfg);
        assert!(d.as_millis() > 0);
    }
}
