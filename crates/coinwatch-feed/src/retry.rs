//! Retry policy for market data requests.

use crate::error::FeedError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backoff settings for retryable fetch failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first request.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay for exponential backoff.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Maximum delay for exponential backoff.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Wait after HTTP 429 when the API sends no `Retry-After`, and the
    /// upper bound on any `Retry-After` the API does send.
    #[serde(default = "default_rate_limit_cooldown_ms")]
    pub rate_limit_cooldown_ms: u64,
}

fn default_max_attempts() -> u32 {
    4
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_rate_limit_cooldown_ms() -> u64 {
    60_000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            rate_limit_cooldown_ms: default_rate_limit_cooldown_ms(),
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Whether another attempt is allowed after `attempt` failed.
    pub fn should_retry(&self, attempt: u32, error: &FeedError) -> bool {
        error.is_retryable() && attempt < self.max_attempts.max(1)
    }

    /// Exponential backoff: base * 2^(attempt-1), capped at `max_delay_ms`,
    /// plus jitter no larger than min(base, 1000ms).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let delay = self
            .base_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_delay_ms);
        let jitter_cap = self.base_delay_ms.min(1000);
        Duration::from_millis(delay + rand_jitter(jitter_cap))
    }

    /// Delay before retrying `error`, which failed attempt number `attempt`.
    ///
    /// A server `Retry-After` is honoured up to `rate_limit_cooldown_ms`.
    pub fn delay_for(&self, attempt: u32, error: &FeedError) -> Duration {
        let cooldown = Duration::from_millis(self.rate_limit_cooldown_ms);
        match error {
            FeedError::RateLimited {
                retry_after: Some(after),
            } => (*after).min(cooldown),
            FeedError::RateLimited { retry_after: None } => cooldown,
            _ => self.backoff_delay(attempt),
        }
    }
}

/// Random jitter in `0..cap` milliseconds.
fn rand_jitter(cap: u64) -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    if cap == 0 {
        return 0;
    }
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    u64::from(nanos) % cap
}
