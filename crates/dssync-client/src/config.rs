//! Client configuration types.

use std::num::NonZeroU32;
use std::time::Duration;

/// Retry policy applied uniformly to every registrar call.
///
/// Only transport-class failures (connection errors, timeouts) are retried;
/// a registrar rejection is returned immediately. The default performs no
/// retries at all.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,

    /// Initial backoff duration
    pub initial_backoff: Duration,

    /// Maximum backoff duration
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryConfig {
    /// No retries
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
        }
    }

    /// Set maximum retries
    #[must_use]
    pub const fn max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    /// Set initial backoff duration
    #[must_use]
    pub const fn initial_backoff(mut self, duration: Duration) -> Self {
        self.initial_backoff = duration;
        self
    }

    /// Set maximum backoff duration
    #[must_use]
    pub const fn max_backoff(mut self, duration: Duration) -> Self {
        self.max_backoff = duration;
        self
    }

    /// Calculate backoff for a given attempt
    #[must_use]
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let initial = u64::try_from(self.initial_backoff.as_millis()).unwrap_or(u64::MAX);
        let max = u64::try_from(self.max_backoff.as_millis()).unwrap_or(u64::MAX);
        let backoff = initial.saturating_mul(2u64.saturating_pow(attempt));
        Duration::from_millis(backoff.min(max))
    }
}

/// Client-side request rate limit
#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    /// Requests allowed per second
    pub per_second: NonZeroU32,
}

impl RateLimit {
    /// Limit to `per_second` requests per second; `None` if zero
    #[must_use]
    pub fn per_second(per_second: u32) -> Option<Self> {
        NonZeroU32::new(per_second).map(|per_second| Self { per_second })
    }
}
