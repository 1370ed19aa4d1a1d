//! Retry policy for cancelled profile fetches.

use std::time::Duration;

/// Bounded exponential backoff.
///
/// The delay before retry `n` (0-based) is `min(base * 2^n, max)`. With the
/// defaults (3 retries, 500ms base, 2000ms cap) a permanently cancelled
/// request is attempted 4 times, waiting 500ms, 1s and 2s in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    /// Default: 3 retries, 500ms base, 2000ms max.
    pub fn new() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(2000),
        }
    }

    pub fn with_config(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    /// Whether a cancelled attempt number `attempt` may be retried.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    /// Delay to wait after cancelled attempt `attempt` before retrying.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Total attempts including the initial one.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}
