//! Reconnection policy after a transport failure.
//!
//! Disabled by default: a failed connection leaves the channel in `Error`
//! until the session changes or the client is re-initialised. When enabled,
//! the delay before attempt `n` (0-based) is `base * 2^n`, capped at
//! `max_delay`, optionally scaled by a random factor in `[0.5, 1.0]`.

use std::time::Duration;

use rand::Rng;

/// When and how often the channel retries after a transport failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// `false` leaves the channel in `Error` after the first failure.
    pub enabled: bool,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
    /// Randomise each delay within `[0.5, 1.0]` of its backoff.
    pub jitter: bool,
}

impl ReconnectPolicy {
    /// Never retries.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Retries forever with capped exponential backoff and jitter.
    pub fn exponential(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            enabled: true,
            base_delay,
            max_delay,
            ..Self::default()
        }
    }

    /// Gives up after `attempts` consecutive failures.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Turns jitter on or off.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Capped exponential delay for attempt `attempt`, without jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.min(30);
        let base_ms = u64::try_from(self.base_delay.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.max_delay.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(base_ms.saturating_mul(1u64 << exp).min(max_ms))
    }

    /// Delay scaled into `[0.5, 1.0]` of the backoff by `factor` in `[0, 1]`.
    pub fn backoff_with_factor(&self, attempt: u32, factor: f64) -> Duration {
        let delay = self.backoff(attempt);
        if !self.jitter {
            return delay;
        }
        let ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        let scale = factor.clamp(0.0, 1.0).mul_add(0.5, 0.5);
        Duration::from_millis((ms as f64 * scale) as u64)
    }

    /// Delay before attempt `attempt`, or `None` when no retry should happen.
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if !self.enabled || self.max_attempts.map_or(false, |max| attempt >= max) {
            return None;
        }
        let factor = rand::thread_rng().gen::<f64>();
        Some(self.backoff_with_factor(attempt, factor))
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            max_attempts: None,
            jitter: true,
        }
    }
}
