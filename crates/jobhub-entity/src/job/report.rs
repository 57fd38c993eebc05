//! Read-only queue health snapshot types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::Job;
use super::status::JobStatus;

/// Number of jobs in each status. Every status is always present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    /// Jobs in `pending`.
    pub pending: i64,
    /// Jobs in `processing`.
    pub processing: i64,
    /// Jobs in `completed`.
    pub completed: i64,
    /// Jobs in `failed`.
    pub failed: i64,
    /// Jobs in `dead`.
    pub dead: i64,
}

impl StatusCounts {
    /// Add `count` to the bucket for `status`.
    pub fn add(&mut self, status: JobStatus, count: i64) {
        match status {
            JobStatus::Pending => self.pending += count,
            JobStatus::Processing => self.processing += count,
            JobStatus::Completed => self.completed += count,
            JobStatus::Failed => self.failed += count,
            JobStatus::Dead => self.dead += count,
        }
    }

    /// Count for a single status.
    pub fn get(&self, status: JobStatus) -> i64 {
        match status {
            JobStatus::Pending => self.pending,
            JobStatus::Processing => self.processing,
            JobStatus::Completed => self.completed,
            JobStatus::Failed => self.failed,
            JobStatus::Dead => self.dead,
        }
    }

    /// Sum over all statuses.
    pub fn total(&self) -> i64 {
        JobStatus::ALL.iter().map(|s| self.get(*s)).sum()
    }
}

/// A job whose latest attempt failed, as shown to operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureSummary {
    /// Job identifier.
    pub id: Uuid,
    /// Queue name.
    pub queue: String,
    /// Handler key.
    pub job_type: String,
    /// Current status.
    pub status: JobStatus,
    /// Claims so far.
    pub attempts: i32,
    /// Failure message.
    pub last_error: Option<String>,
    /// When the failure was recorded (`dead_at` for dead jobs).
    pub failed_at: Option<DateTime<Utc>>,
}

impl From<&Job> for FailureSummary {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            queue: job.queue.clone(),
            job_type: job.job_type.clone(),
            status: job.status,
            attempts: job.attempts,
            last_error: job.last_error.clone(),
            failed_at: job.last_failure_at(),
        }
    }
}

/// Backlog health snapshot returned by the status reporter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueStatus {
    /// Jobs per status.
    pub status_counts: StatusCounts,
    /// Claimable jobs per queue.
    pub pending_by_queue: BTreeMap<String, i64>,
    /// Most recent failures, newest first.
    pub recent_failures: Vec<FailureSummary>,
    /// Age of the oldest claimable job, in milliseconds.
    pub oldest_pending_age_ms: Option<i64>,
}
