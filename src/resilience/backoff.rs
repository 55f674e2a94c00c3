//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

/// Exponential delay schedule capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(base_ms: u64, max_ms: u64) -> Self {
        Self {
            base: Duration::from_millis(base_ms),
            max: Duration::from_millis(max_ms),
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    ///
    /// Adds up to 10% jitter on top of the capped delay.
    pub fn delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_ms = self.base.as_millis() as u64;
        let max_ms = self.max.as_millis() as u64;
        let capped = base_ms
            .saturating_mul(2u64.saturating_pow(attempt - 1))
            .min(max_ms);

        let jitter_range = capped / 10;
        let jitter = if jitter_range > 0 {
            rand::thread_rng().gen_range(0..jitter_range)
        } else {
            0
        };

        Duration::from_millis(capped.saturating_add(jitter))
    }
}
