//! Retry policy configuration.

use serde::{Deserialize, Serialize};

/// Which retry policy the store applies to failed jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryPolicyKind {
    /// `base * factor^(attempt - 1)`, capped at `max_delay_ms`.
    #[default]
    Exponential,
    /// Constant `base_delay_ms` between attempts.
    Fixed,
    /// Dead-letter on the first failure.
    None,
}

/// Retry and backoff settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Policy selection.
    #[serde(default)]
    pub policy: RetryPolicyKind,
    /// `max_attempts` for jobs enqueued without one.
    #[serde(default = "default_max_attempts")]
    pub default_max_attempts: i32,
    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,
    /// Upper bound on any single backoff delay, in milliseconds.
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
    /// Exponential growth factor.
    #[serde(default = "default_factor")]
    pub factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            policy: RetryPolicyKind::default(),
            default_max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
            factor: default_factor(),
        }
    }
}

fn default_max_attempts() -> i32 {
    3
}

fn default_base_delay() -> u64 {
    5_000
}

fn default_max_delay() -> u64 {
    3_600_000
}

fn default_factor() -> f64 {
    2.0
}
