//! Retry policy trait and the failure/decision types it operates on.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Classification hint attached to a job failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// May succeed on a later attempt (timeouts, downstream outages).
    Transient,
    /// Can never succeed as submitted (malformed payload, unknown job type).
    Permanent,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => write!(f, "transient"),
            Self::Permanent => write!(f, "permanent"),
        }
    }
}

/// A failed execution attempt as reported to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    /// Failure classification.
    pub kind: FailureKind,
    /// Message persisted as the job's `last_error`.
    pub message: String,
}

impl JobFailure {
    /// A failure worth retrying.
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Transient,
            message: message.into(),
        }
    }

    /// A failure that will recur on every attempt.
    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Permanent,
            message: message.into(),
        }
    }
}

/// What the store does with a failed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RetryDecision {
    /// Return the job to `pending`, claimable after `delay`.
    Requeue {
        /// Backoff before the job becomes eligible again.
        #[serde(with = "duration_ms")]
        delay: Duration,
    },
    /// Move the job to the terminal `dead` state.
    DeadLetter,
}

impl RetryDecision {
    /// Whether the job stays in circulation.
    pub fn is_requeue(&self) -> bool {
        matches!(self, Self::Requeue { .. })
    }
}

/// Decides the fate of a failed job.
///
/// `attempts` already counts the attempt that just failed. Implementations
/// must be pure: the store calls them while applying the outcome and relies
/// on the same inputs always producing the same decision.
pub trait RetryPolicy: Send + Sync + fmt::Debug {
    /// Decide between requeue-with-delay and dead-letter.
    fn decide(&self, attempts: i32, max_attempts: i32, failure: &JobFailure) -> RetryDecision;
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
