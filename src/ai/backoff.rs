//! Retry policy for transient model API failures.

use std::time::Duration;

use rand::Rng;

use crate::config::{AI_MAX_ATTEMPTS, AI_RETRY_BASE_DELAY, AI_RETRY_MAX_JITTER_MS};

/// How often and how patiently transient failures are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts in total, the first call included
    pub max_attempts: u32,
    /// Delay multiplied by the attempt number
    pub base_delay: Duration,
    /// Upper bound (inclusive) of the random jitter in milliseconds
    pub max_jitter_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: AI_MAX_ATTEMPTS,
            base_delay: AI_RETRY_BASE_DELAY,
            max_jitter_ms: AI_RETRY_MAX_JITTER_MS,
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt following failed attempt `attempt` (1-based):
    /// `base_delay * attempt + jitter`, jitter uniform in `[0, max_jitter_ms]`.
    pub fn delay<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let jitter = rng.random_range(0..=self.max_jitter_ms);
        self.base_delay * attempt + Duration::from_millis(jitter)
    }
}

/// [`RetryPolicy::delay`] with the default policy.
pub fn retry_delay<R: Rng + ?Sized>(attempt: u32, rng: &mut R) -> Duration {
    RetryPolicy::default().delay(attempt, rng)
}
