//! Route definitions for the JobHub HTTP API.
//!
//! All routes are mounted under `/api`. The router receives `AppState` and
//! passes it to all handlers via Axum's `State` extractor.

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the Axum router with all routes and request logging.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(job_routes())
        .merge(admin_routes())
        .merge(health_routes());

    Router::new()
        .nest("/api", api_routes)
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Producer endpoints
fn job_routes() -> Router<AppState> {
    Router::new().route("/jobs", post(handlers::jobs::enqueue))
}

/// Queue administration endpoints
fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/queue/status", get(handlers::admin::queue::get_status))
        .route("/admin/queue/run", post(handlers::admin::queue::run_worker))
        .route("/admin/queue/dead", get(handlers::admin::queue::list_dead))
        .route(
            "/admin/queue/dead/retry",
            post(handlers::admin::queue::retry_dead),
        )
        .route("/admin/queue/jobs/{id}", get(handlers::admin::queue::get_job))
}

/// Liveness and dependency checks
fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/health/detailed", get(handlers::health::health_detailed))
}
