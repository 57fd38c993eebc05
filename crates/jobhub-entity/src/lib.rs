//! # jobhub-entity
//!
//! Domain entity models for JobHub. [`job::Job`] is the single persisted
//! entity; the remaining types are value objects exchanged between the
//! store, the dispatcher and the admin surface. Database entities derive
//! `sqlx::FromRow`.

pub mod job;

pub use job::{FailureSummary, Job, JobStatus, NewJob, QueueStatus, StatusCounts};
