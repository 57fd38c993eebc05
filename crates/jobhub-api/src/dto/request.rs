//! Request DTOs with validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use jobhub_worker::JobCreateParams;

/// Largest batch a single admin-triggered dispatch may claim.
pub const MAX_BATCH_SIZE: usize = 1000;

/// Job submission body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EnqueueJobRequest {
    /// Handler key.
    #[validate(length(min = 1, max = 128, message = "job_type must be 1-128 characters"))]
    pub job_type: String,
    /// Queue name; the configured default when omitted.
    #[validate(length(min = 1, max = 128, message = "queue must be 1-128 characters"))]
    pub queue: Option<String>,
    /// Job payload.
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Attempt ceiling; the configured default when omitted.
    #[validate(range(min = 1, max = 1000))]
    pub max_attempts: Option<i32>,
    /// Delay the first attempt until this time.
    pub run_at: Option<DateTime<Utc>>,
}

impl From<EnqueueJobRequest> for JobCreateParams {
    fn from(req: EnqueueJobRequest) -> Self {
        Self {
            job_type: req.job_type,
            queue: req.queue,
            payload: req.payload,
            max_attempts: req.max_attempts,
            run_at: req.run_at,
        }
    }
}

/// Body for `POST /api/admin/queue/run`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RunWorkerRequest {
    /// Jobs to claim in this cycle.
    #[validate(range(min = 1, max = 1000, message = "batch_size must be between 1 and 1000"))]
    pub batch_size: usize,
    /// Restrict the cycle to one queue.
    #[validate(length(min = 1, max = 128))]
    pub queue: Option<String>,
}

/// Body for `POST /api/admin/queue/dead/retry`.
///
/// Omitting `job_ids` retries every dead job; an empty list retries none.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RetryDeadRequest {
    /// Dead jobs to retry.
    pub job_ids: Option<Vec<Uuid>>,
    /// Operator recorded in the log entry.
    #[validate(length(max = 128))]
    pub requested_by: Option<String>,
}

/// Query for `GET /api/admin/queue/status`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusQuery {
    /// Number of recent failures to include (default 10, max 100).
    pub recent_failures: Option<i64>,
}

impl StatusQuery {
    /// Effective failure limit.
    pub fn limit(&self) -> i64 {
        self.recent_failures.unwrap_or(10).clamp(0, 100)
    }
}

/// Query for `GET /api/admin/queue/dead`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeadListQuery {
    /// Number of dead jobs to return (default 50, max 500).
    pub limit: Option<i64>,
}

impl DeadListQuery {
    /// Effective limit.
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(50).clamp(1, 500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_request_bounds() {
        let ok = RunWorkerRequest {
            batch_size: MAX_BATCH_SIZE,
            queue: None,
        };
        assert!(ok.validate().is_ok());

        let zero = RunWorkerRequest {
            batch_size: 0,
            queue: None,
        };
        assert!(zero.validate().is_err());

        let huge = RunWorkerRequest {
            batch_size: MAX_BATCH_SIZE + 1,
            queue: Some("default".to_string()),
        };
        assert!(huge.validate().is_err());
    }

    #[test]
    fn test_enqueue_request_validation() {
        let req: EnqueueJobRequest = serde_json::from_value(serde_json::json!({
            "job_type": "webhook.deliver",
            "payload": {"url": "https://example.com"}
        }))
        .unwrap();
        assert!(req.validate().is_ok());

        let req = EnqueueJobRequest {
            max_attempts: Some(0),
            ..req
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_query_limits_are_clamped() {
        assert_eq!(StatusQuery::default().limit(), 10);
        assert_eq!(StatusQuery { recent_failures: Some(5000) }.limit(), 100);
        assert_eq!(DeadListQuery { limit: Some(0) }.limit(), 1);
    }
}
