//! Core traits defined in `jobhub-core` and implemented by other crates.

pub mod retry_policy;

pub use retry_policy::{FailureKind, JobFailure, RetryDecision, RetryPolicy};
