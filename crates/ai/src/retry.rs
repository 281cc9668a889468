//! Retry policy for transient model failures.
//!
//! Only [`ModelError::is_transient`](crate::model::ModelError::is_transient)
//! failures are retried. Every delay counts against the caller's latency, so
//! the defaults stay small: one retry, half a second, capped at four.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    Fixed,
    /// Doubles after every failed attempt, up to `max_delay`.
    #[default]
    Exponential,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Attempts including the first one; `1` disables retries.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub strategy: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::with_retries(1)
    }
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self::with_retries(0)
    }

    /// `retries` extra attempts after the first, exponential backoff from 500ms.
    pub fn with_retries(retries: u32) -> Self {
        Self {
            max_attempts: retries.saturating_add(1),
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(4),
            strategy: BackoffStrategy::Exponential,
        }
    }

    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: delay,
            max_delay: delay,
            strategy: BackoffStrategy::Fixed,
        }
    }

    /// Pause after failed attempt `attempt` (1-indexed) before the next one.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match (self.strategy, attempt) {
            (_, 0) => Duration::ZERO,
            (BackoffStrategy::Fixed, _) => self.base_delay,
            (BackoffStrategy::Exponential, n) => {
                let factor = 1u32.checked_shl(n - 1).unwrap_or(u32::MAX);
                self.base_delay
                    .checked_mul(factor)
                    .map_or(self.max_delay, |d| d.min(self.max_delay))
            }
        }
    }

    /// Whether another attempt is allowed after `attempts_made` attempts.
    pub fn should_retry(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }
}
