//! Producer API for enqueuing background jobs.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use jobhub_core::config::WorkerConfig;
use jobhub_core::result::AppResult;
use jobhub_database::JobStore;
use jobhub_entity::job::{Job, NewJob};

/// Parameters for creating a new job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobCreateParams {
    /// Type of job (e.g., "webhook.deliver", "contact.sync")
    pub job_type: String,
    /// Queue name; the configured default queue when omitted
    pub queue: Option<String>,
    /// Job payload as JSON
    pub payload: serde_json::Value,
    /// Attempt ceiling; the configured default when omitted
    pub max_attempts: Option<i32>,
    /// Optional scheduled time (run after this time)
    pub run_at: Option<DateTime<Utc>>,
}

impl JobCreateParams {
    /// Parameters with every optional field left to configuration.
    pub fn new(job_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            job_type: job_type.into(),
            queue: None,
            payload,
            max_attempts: None,
            run_at: None,
        }
    }
}

/// Job queue for enqueuing work
#[derive(Debug, Clone)]
pub struct JobQueue {
    store: Arc<dyn JobStore>,
    default_queue: String,
    default_max_attempts: i32,
}

impl JobQueue {
    /// Create a new job queue using the worker defaults
    pub fn new(store: Arc<dyn JobStore>, config: &WorkerConfig) -> Self {
        Self {
            store,
            default_queue: config.default_queue.clone(),
            default_max_attempts: config.retry.default_max_attempts,
        }
    }

    /// Enqueue a job and return its id.
    pub async fn enqueue(
        &self,
        job_type: &str,
        queue: Option<&str>,
        payload: serde_json::Value,
        max_attempts: Option<i32>,
    ) -> AppResult<Uuid> {
        let params = JobCreateParams {
            job_type: job_type.to_string(),
            queue: queue.map(str::to_string),
            payload,
            max_attempts,
            run_at: None,
        };
        Ok(self.submit(params).await?.id)
    }

    /// Enqueue a job from full parameters and return the stored record.
    pub async fn submit(&self, params: JobCreateParams) -> AppResult<Job> {
        let mut job = NewJob::new(
            params.job_type,
            params.queue.unwrap_or_else(|| self.default_queue.clone()),
            params.payload,
            params.max_attempts.unwrap_or(self.default_max_attempts),
        );
        job.run_at = params.run_at;

        self.store.enqueue(job).await
    }
}
