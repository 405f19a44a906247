//! Exponential backoff arithmetic.
//!
//! Pure delay calculation shared by the rate-limit retry wrapper. The
//! caller owns the sleeping; this module only answers "how long".

use std::time::Duration;

/// Base delay before the first rate-limit retry.
///
/// The hosted inference API documents a budget of roughly 6 requests
/// per minute (~10 s spacing), padded to 12 s.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(12);

/// Default number of retries after the initial attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Tunable parameters for the exponential-backoff strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Factor by which the delay grows after each retry.
    pub multiplier: f64,
    /// Optional upper bound on a single delay.
    pub max_delay: Option<Duration>,
    /// Retries allowed after the initial attempt.
    pub max_retries: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            multiplier: 2.0,
            max_delay: None,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl BackoffConfig {
    /// Delay before retry number `retry` (1-based).
    ///
    /// `base * multiplier^(retry - 1)`, clamped to `max_delay` when set.
    /// `retry == 0` is treated as the first retry.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1) as i32;
        let ms = self.base_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        let delay = Duration::from_millis(ms.min(u64::MAX as f64) as u64);
        match self.max_delay {
            Some(max) => delay.min(max),
            None => delay,
        }
    }

    /// Sum of every delay in a full retry series.
    pub fn total_delay(&self) -> Duration {
        (1..=self.max_retries).map(|r| self.delay_for_retry(r)).sum()
    }
}
