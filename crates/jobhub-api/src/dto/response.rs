//! Response DTOs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Returned by `POST /api/jobs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueResponse {
    /// Id of the new job.
    pub id: Uuid,
}

/// Returned by `POST /api/admin/queue/dead/retry`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryDeadResponse {
    /// Dead jobs moved back to `pending`.
    pub retried_count: u64,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status.
    pub status: String,
    /// Version.
    pub version: String,
    /// Uptime.
    pub uptime_seconds: u64,
}

/// Detailed health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedHealthResponse {
    /// Overall status.
    pub status: String,
    /// Job store backend (`postgres` or `memory`).
    pub backend: String,
    /// Job store status.
    pub database: String,
    /// Dispatcher identity.
    pub worker_id: String,
    /// Job types with a registered handler.
    pub handlers: Vec<String>,
    /// Uptime.
    pub uptime_seconds: u64,
}
