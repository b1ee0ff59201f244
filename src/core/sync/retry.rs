//! Bounded exponential backoff for transient fetch failures

use crate::config::RetryConfig;
use rand::Rng;
use std::time::Duration;

/// Retry schedule for one page fetch
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts per page, including the first
    pub max_attempts: usize,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            backoff_multiplier: config.backoff_multiplier,
            jitter: config.jitter,
        }
    }

    /// Whether another attempt follows the failed `attempt` (1-based)
    pub fn allows_retry_after(&self, attempt: usize) -> bool {
        attempt < self.max_attempts
    }

    /// Delay before the attempt that follows the failed `attempt` (1-based)
    ///
    /// `initial_delay * multiplier^(attempt-1)`, capped at `max_delay`, plus
    /// up to 20% jitter. A server-supplied `Retry-After` raises the delay to
    /// at least that many seconds, but never past `max_delay`.
    pub fn delay_for(&self, attempt: usize, retry_after_secs: Option<u64>) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let base_ms =
            self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        let capped_ms = base_ms.min(self.max_delay.as_millis() as f64);

        let jittered_ms = if self.jitter && capped_ms > 0.0 {
            capped_ms * (1.0 + rand::thread_rng().gen_range(0.0..0.2))
        } else {
            capped_ms
        };

        let delay = Duration::from_millis(jittered_ms as u64);
        match retry_after_secs {
            Some(secs) => delay.max(Duration::from_secs(secs).min(self.max_delay)),
            None => delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
