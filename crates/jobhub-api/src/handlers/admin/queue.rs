//! Queue administration handlers.

use axum::Json;
use axum::extract::{Path, Query, State};

use jobhub_core::error::AppError;
use jobhub_entity::job::{Job, QueueStatus};
use jobhub_worker::DispatchReport;

use crate::dto::request::{DeadListQuery, RetryDeadRequest, RunWorkerRequest, StatusQuery};
use crate::dto::response::{ApiResponse, RetryDeadResponse};
use crate::error::ApiError;
use crate::extractors::{ValidatedJson, parse_uuid};
use crate::state::AppState;

/// GET /api/admin/queue/status
pub async fn get_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<ApiResponse<QueueStatus>>, ApiError> {
    let status = state.reporter.snapshot(query.limit()).await?;
    Ok(Json(ApiResponse::ok(status)))
}

/// POST /api/admin/queue/run
///
/// Runs one dispatch cycle in the request and returns once the batch has
/// settled.
pub async fn run_worker(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RunWorkerRequest>,
) -> Result<Json<ApiResponse<DispatchReport>>, ApiError> {
    let report = state
        .dispatcher
        .run(req.batch_size, req.queue.as_deref())
        .await?;
    Ok(Json(ApiResponse::ok(report)))
}

/// POST /api/admin/queue/dead/retry
pub async fn retry_dead(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RetryDeadRequest>,
) -> Result<Json<ApiResponse<RetryDeadResponse>>, ApiError> {
    let retried_count = state
        .dead_letters
        .retry(req.job_ids.as_deref(), req.requested_by.as_deref())
        .await?;
    Ok(Json(ApiResponse::ok(RetryDeadResponse { retried_count })))
}

/// GET /api/admin/queue/dead
pub async fn list_dead(
    State(state): State<AppState>,
    Query(query): Query<DeadListQuery>,
) -> Result<Json<ApiResponse<Vec<Job>>>, ApiError> {
    let jobs = state.dead_letters.list(query.limit()).await?;
    Ok(Json(ApiResponse::ok(jobs)))
}

/// GET /api/admin/queue/jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Job>>, ApiError> {
    let id = parse_uuid(&id)?;
    let job = state
        .store
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Job {id} not found")))?;
    Ok(Json(ApiResponse::ok(job)))
}
