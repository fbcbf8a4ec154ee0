//! Per-endpoint backoff state machine.
//!
//! Success resets the endpoint to immediately eligible. Each failure pushes
//! the next eligible time out: exactly `min` after the first failure, then
//! exponentially (with jitter) up to `max`.

use appconfig_types::FailoverOptions;
use rand::Rng;
use std::time::{Duration, Instant};

/// Largest exponent applied to the minimum backoff.
const MAX_EXPONENT: u32 = 30;

/// Backoff curve.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    min: Duration,
    max: Duration,
    jitter_ratio: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_options(&FailoverOptions::default())
    }
}

impl BackoffPolicy {
    pub fn new(min: Duration, max: Duration, jitter_ratio: f64) -> Self {
        Self { min, max: max.max(min), jitter_ratio: jitter_ratio.clamp(0.0, 1.0) }
    }

    pub fn from_options(options: &FailoverOptions) -> Self {
        Self::new(options.min_backoff(), options.max_backoff(), options.jitter_ratio)
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    /// Backoff for the given consecutive failure count.
    pub fn duration(&self, failed_attempts: u32) -> Duration {
        self.duration_with_sample(failed_attempts, rand::thread_rng().gen::<f64>())
    }

    /// Same as [`duration`](Self::duration) with the jitter sample supplied
    /// (`sample` in `[0, 1)`, 0.5 means no jitter).
    pub fn duration_with_sample(&self, failed_attempts: u32, sample: f64) -> Duration {
        if failed_attempts <= 1 {
            return self.min;
        }

        let exponent = (failed_attempts - 1).min(MAX_EXPONENT);
        let base = self.min.saturating_mul(1u32 << exponent).min(self.max);
        let jitter = 1.0 + self.jitter_ratio * (2.0 * sample.clamp(0.0, 1.0) - 1.0);

        Duration::try_from_secs_f64(base.as_secs_f64() * jitter)
            .unwrap_or(self.max)
            .max(self.min)
            .min(self.max)
    }
}

/// Health bookkeeping for one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffState {
    failed_attempts: u32,
    backoff_end: Instant,
}

impl BackoffState {
    /// Healthy state, eligible at `now`.
    pub fn new(now: Instant) -> Self {
        Self { failed_attempts: 0, backoff_end: now }
    }

    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    pub fn backoff_end(&self) -> Instant {
        self.backoff_end
    }

    pub fn is_available(&self, now: Instant) -> bool {
        self.backoff_end <= now
    }

    pub fn record_success(&mut self, now: Instant) {
        self.failed_attempts = 0;
        self.backoff_end = now;
    }

    /// Returns the backoff applied.
    pub fn record_failure(&mut self, now: Instant, policy: &BackoffPolicy) -> Duration {
        self.failed_attempts = self.failed_attempts.saturating_add(1);
        let backoff = policy.duration(self.failed_attempts);
        self.backoff_end = saturating_deadline(now, backoff);
        backoff
    }
}

/// `now + backoff`, shortened to the latest representable instant on overflow.
fn saturating_deadline(now: Instant, backoff: Duration) -> Instant {
    let mut remaining = backoff;
    loop {
        if let Some(deadline) = now.checked_add(remaining) {
            return deadline;
        }
        if remaining.is_zero() {
            return now;
        }
        remaining /= 2;
    }
}
