//! Job entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use jobhub_core::error::AppError;

use super::status::JobStatus;

/// Longest accepted queue or job type name.
pub const MAX_NAME_LEN: usize = 128;

/// A background job record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Job {
    /// Unique job identifier (UUIDv7, time-ordered).
    pub id: Uuid,
    /// Logical queue used for grouping and backlog reporting.
    pub queue: String,
    /// Handler key (e.g. `"webhook.deliver"`, `"contact.sync"`).
    pub job_type: String,
    /// Job-specific payload, opaque to the queue.
    pub payload: serde_json::Value,
    /// Current job status.
    pub status: JobStatus,
    /// Number of claims so far.
    pub attempts: i32,
    /// Claims allowed before the job is dead-lettered.
    pub max_attempts: i32,
    /// Most recent failure message.
    pub last_error: Option<String>,
    /// Earliest time the job may be claimed.
    pub available_at: DateTime<Utc>,
    /// Worker currently holding the lease.
    pub lease_owner: Option<String>,
    /// Lease expiry.
    pub leased_until: Option<DateTime<Utc>>,
    /// When the job was enqueued.
    pub created_at: DateTime<Utc>,
    /// When the job was last claimed.
    pub claimed_at: Option<DateTime<Utc>>,
    /// When the job completed.
    pub completed_at: Option<DateTime<Utc>>,
    /// When the most recent attempt failed.
    pub failed_at: Option<DateTime<Utc>>,
    /// When the job was dead-lettered.
    pub dead_at: Option<DateTime<Utc>>,
    /// When the record last changed.
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Build a fresh `pending` record from enqueue parameters.
    pub fn from_new(new: NewJob, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            queue: new.queue,
            job_type: new.job_type,
            payload: new.payload,
            status: JobStatus::Pending,
            attempts: 0,
            max_attempts: new.max_attempts,
            last_error: None,
            available_at: new.run_at.unwrap_or(now),
            lease_owner: None,
            leased_until: None,
            created_at: now,
            claimed_at: None,
            completed_at: None,
            failed_at: None,
            dead_at: None,
            updated_at: now,
        }
    }

    /// Whether the lease on a `processing` job has lapsed.
    pub fn lease_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Processing
            && self.leased_until.is_none_or(|until| until < now)
    }

    /// Whether `claim_batch` may pick this job up at `now`.
    pub fn is_claimable(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            JobStatus::Pending => self.available_at <= now,
            JobStatus::Processing => self.lease_expired(now),
            _ => false,
        }
    }

    /// Whether `owner` holds a live lease on this job.
    pub fn is_leased_by(&self, owner: &str) -> bool {
        self.status == JobStatus::Processing && self.lease_owner.as_deref() == Some(owner)
    }

    /// Time of the most recent failure, preferring the dead-letter stamp.
    pub fn last_failure_at(&self) -> Option<DateTime<Utc>> {
        self.dead_at.or(self.failed_at)
    }
}

/// Data required to enqueue a new job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJob {
    /// Handler key.
    pub job_type: String,
    /// Queue name.
    pub queue: String,
    /// Job-specific payload.
    pub payload: serde_json::Value,
    /// Claims allowed before dead-lettering.
    pub max_attempts: i32,
    /// Delay the first attempt until this time.
    pub run_at: Option<DateTime<Utc>>,
}

impl NewJob {
    /// Create enqueue parameters with the given attempt ceiling.
    pub fn new(
        job_type: impl Into<String>,
        queue: impl Into<String>,
        payload: serde_json::Value,
        max_attempts: i32,
    ) -> Self {
        Self {
            job_type: job_type.into(),
            queue: queue.into(),
            payload,
            max_attempts,
            run_at: None,
        }
    }

    /// Schedule the first attempt for a later time.
    pub fn run_at(mut self, at: DateTime<Utc>) -> Self {
        self.run_at = Some(at);
        self
    }

    /// Check names and the attempt ceiling before the job reaches a store.
    pub fn validate(&self) -> Result<(), AppError> {
        validate_name("job_type", &self.job_type)?;
        validate_name("queue", &self.queue)?;
        if self.max_attempts < 1 {
            return Err(AppError::validation(format!(
                "max_attempts must be at least 1, got {}",
                self.max_attempts
            )));
        }
        Ok(())
    }
}

fn validate_name(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} must not be empty")));
    }
    if value.len() > MAX_NAME_LEN {
        return Err(AppError::validation(format!(
            "{field} must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}
