//! Job submission handler.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use crate::dto::request::EnqueueJobRequest;
use crate::dto::response::{ApiResponse, EnqueueResponse};
use crate::error::ApiError;
use crate::extractors::ValidatedJson;
use crate::state::AppState;

/// POST /api/jobs
pub async fn enqueue(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<EnqueueJobRequest>,
) -> Result<(StatusCode, Json<ApiResponse<EnqueueResponse>>), ApiError> {
    let job = state.queue.submit(req.into()).await?;

    tracing::info!(
        job_id = %job.id,
        job_type = %job.job_type,
        queue = %job.queue,
        "Job submitted"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(EnqueueResponse { id: job.id })),
    ))
}
