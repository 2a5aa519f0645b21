//! Retry policy and backoff computation

use crate::error::{ExecError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How failed attempts are retried
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Delay before the first retry
    pub base_delay: Duration,

    /// Upper bound on any single delay
    pub max_delay: Duration,

    /// Growth factor between consecutive retries
    pub multiplier: f64,

    /// Random extra delay as a fraction of the computed delay (0.0 - 1.0)
    pub jitter: f64,

    /// Whether a missing or non-executable program is retried like any
    /// other failure
    pub retry_spawn_errors: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            jitter: 0.0,
            retry_spawn_errors: true,
        }
    }
}

impl RetryPolicy {
    /// Policy with no waiting between attempts
    pub fn immediate() -> Self {
        Self {
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.multiplier < 1.0 || !self.multiplier.is_finite() {
            return Err(ExecError::Config(
                "retry multiplier must be at least 1.0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(ExecError::Config(
                "retry jitter must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.max_delay < self.base_delay {
            return Err(ExecError::Config(
                "retry max_delay must not be below base_delay".to_string(),
            ));
        }

        Ok(())
    }

    /// Delay before retry number `retry` (1-based), without jitter
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(32) as i32;
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = secs.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped.max(0.0))
    }

    /// Whether a failed attempt with this error may be retried
    pub fn allows_retry(&self, error: &ExecError) -> bool {
        if error.is_permanent_spawn_failure() {
            return self.retry_spawn_errors;
        }
        error.is_retryable()
    }

    pub fn backoff(&self) -> Backoff<'_> {
        Backoff {
            policy: self,
            retry: 0,
            last: Duration::ZERO,
        }
    }
}

/// Delays for one call's retries
///
/// Jitter is added on top of the computed delay and every delay is clamped
/// to at least the previous one, so the sequence never shrinks.
#[derive(Debug)]
pub struct Backoff<'a> {
    policy: &'a RetryPolicy,
    retry: u32,
    last: Duration,
}

impl Backoff<'_> {
    pub fn next_delay(&mut self) -> Duration {
        self.retry += 1;
        let mut delay = self.policy.delay_for(self.retry);

        if self.policy.jitter > 0.0 && !delay.is_zero() {
            let extra = delay.as_secs_f64() * self.policy.jitter * rand::random::<f64>();
            delay += Duration::from_secs_f64(extra);
        }

        delay = delay.max(self.last);
        self.last = delay;
        delay
    }

    /// Retries handed out so far
    pub fn retries(&self) -> u32 {
        self.retry
    }
}
