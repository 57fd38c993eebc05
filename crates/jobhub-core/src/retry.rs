//! Built-in retry policies.
//!
//! All policies share two rules: a permanent failure is dead-lettered at
//! once, and a job whose `attempts` reached `max_attempts` is dead-lettered.
//! They differ only in the delay applied to a requeued job.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{RetryConfig, RetryPolicyKind};
use crate::traits::retry_policy::{FailureKind, JobFailure, RetryDecision, RetryPolicy};

fn exhausted(attempts: i32, max_attempts: i32, failure: &JobFailure) -> bool {
    failure.kind == FailureKind::Permanent || attempts >= max_attempts
}

/// Exponential backoff: `base * factor^(attempts - 1)`, capped at `max_delay`.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base: Duration,
    max_delay: Duration,
    factor: f64,
}

impl ExponentialBackoff {
    /// Create a policy. `factor` below 1.0 is clamped to 1.0.
    pub fn new(base: Duration, max_delay: Duration, factor: f64) -> Self {
        Self {
            base,
            max_delay,
            factor: factor.max(1.0),
        }
    }

    /// Delay applied after the given (1-based) failed attempt.
    pub fn delay_for(&self, attempts: i32) -> Duration {
        let exponent = attempts.saturating_sub(1).max(0);
        let millis = self.base.as_millis() as f64 * self.factor.powi(exponent);
        let capped = millis.min(self.max_delay.as_millis() as f64);
        if capped.is_finite() {
            Duration::from_millis(capped.round() as u64)
        } else {
            self.max_delay
        }
    }
}

impl RetryPolicy for ExponentialBackoff {
    fn decide(&self, attempts: i32, max_attempts: i32, failure: &JobFailure) -> RetryDecision {
        if exhausted(attempts, max_attempts, failure) {
            return RetryDecision::DeadLetter;
        }
        RetryDecision::Requeue {
            delay: self.delay_for(attempts),
        }
    }
}

/// Constant delay between attempts.
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    /// Create a policy that always waits `delay` before the next attempt.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Retry immediately. Mostly useful in tests.
    pub fn immediate() -> Self {
        Self::new(Duration::ZERO)
    }
}

impl RetryPolicy for FixedDelay {
    fn decide(&self, attempts: i32, max_attempts: i32, failure: &JobFailure) -> RetryDecision {
        if exhausted(attempts, max_attempts, failure) {
            return RetryDecision::DeadLetter;
        }
        RetryDecision::Requeue { delay: self.delay }
    }
}

/// Dead-letter every failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

impl RetryPolicy for NoRetry {
    fn decide(&self, _attempts: i32, _max_attempts: i32, _failure: &JobFailure) -> RetryDecision {
        RetryDecision::DeadLetter
    }
}

/// Build the policy selected in configuration.
pub fn policy_from_config(config: &RetryConfig) -> Arc<dyn RetryPolicy> {
    let base = Duration::from_millis(config.base_delay_ms);
    match config.policy {
        RetryPolicyKind::Exponential => Arc::new(ExponentialBackoff::new(
            base,
            Duration::from_millis(config.max_delay_ms),
            config.factor,
        )),
        RetryPolicyKind::Fixed => Arc::new(FixedDelay::new(base)),
        RetryPolicyKind::None => Arc::new(NoRetry),
    }
}
