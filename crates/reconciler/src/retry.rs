//! Exponential backoff with jitter for failed or rate-limited requeues.

use std::time::Duration;

use rand::Rng;

/// Configuration for requeue backoff.
///
/// The delay for the `n`th consecutive failure (1-indexed) is
/// `initial_delay * multiplier^(n-1)`, capped at `max_delay`, plus up to 25%
/// jitter (the cap still holds after jitter).
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    /// Delay after the first failure.
    pub initial_delay: Duration,
    /// Upper bound for any delay.
    pub max_delay: Duration,
    /// Growth factor per consecutive failure.
    pub multiplier: f64,
    /// Whether to spread retries of many keys apart.
    pub jitter: bool,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(300),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl Backoff {
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    #[must_use]
    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    #[must_use]
    pub const fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    #[must_use]
    pub const fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before retrying after `failures` consecutive failures.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn delay(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(failures.saturating_sub(1)).unwrap_or(i32::MAX);
        let max_ms = self.max_delay.as_millis() as f64;
        let base_ms = (self.initial_delay.as_millis() as f64 * self.multiplier.powi(exponent)).min(max_ms);

        let final_ms = if self.jitter {
            let jitter_factor = 1.0 + rand::thread_rng().gen_range(0.0..0.25);
            (base_ms * jitter_factor).min(max_ms)
        } else {
            base_ms
        };

        Duration::from_millis(final_ms as u64)
    }
}
