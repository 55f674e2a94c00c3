//! Retry logic for origin connects.
//!
//! # Responsibilities
//! - Decide how many connect attempts a fetch may make
//! - Supply the backoff delay between attempts
//!
//! # Design Decisions
//! - Only connection establishment is retried; once request bytes are on
//!   the wire the outcome is final (POST is not idempotent)
//! - Disabled policy means exactly one attempt

use std::time::Duration;

use crate::config::RetryConfig;
use crate::resilience::backoff::Backoff;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff: Backoff::new(0, 0),
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        if !config.enabled {
            return Self::none();
        }
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff: Backoff::new(config.base_delay_ms, config.max_delay_ms),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the next attempt, or `None` once attempts are exhausted.
    pub fn next_delay(&self, attempts_made: u32) -> Option<Duration> {
        (attempts_made < self.max_attempts).then(|| self.backoff.delay(attempts_made))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}
