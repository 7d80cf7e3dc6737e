//! Exponential backoff schedule for classifier API calls.

use std::time::Duration;

use rand::Rng;

/// Backoff configuration applied between transient classifier failures.
///
/// The default mirrors the production schedule: three attempts total, 500ms
/// initial delay, doubling up to a 4s cap, with ±10% jitter to avoid
/// synchronized retry bursts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Ceiling on the computed delay, pre-jitter.
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each retry.
    pub backoff_factor: f64,
    /// Random jitter range as a fraction (0.1 = ±10%).
    pub jitter_percent: f64,
    /// Total attempts, including the first call.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(4),
            backoff_factor: 2.0,
            jitter_percent: 0.1,
            max_attempts: 3,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries; the first failure is final.
    #[must_use]
    pub fn no_retries() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Calculate the delay for a given retry number (0-indexed: the wait
    /// before the second attempt is `delay_for_attempt(0)`).
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // ms values are well within f64 precision
    #[allow(clippy::cast_possible_wrap)] // exponent is capped at 31
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let initial_ms = u64::try_from(self.initial_delay.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.max_delay.as_millis()).unwrap_or(u64::MAX);

        // Cap the exponent so powi cannot overflow.
        let exp = attempt.min(31) as i32;
        let base_ms = (initial_ms as f64) * self.backoff_factor.powi(exp);
        let base_ms = base_ms.min(max_ms as f64);

        let jitter = if self.jitter_percent > 0.0 {
            let mut rng = rand::rng();
            let jitter_range = base_ms * self.jitter_percent;
            rng.random_range(-jitter_range..=jitter_range)
        } else {
            0.0
        };

        let delay_ms = (base_ms + jitter).max(0.0);
        Duration::from_millis(delay_ms as u64)
    }
}
