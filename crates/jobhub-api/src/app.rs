//! Application builder: wires router, middleware and state into an Axum app,
//! and runs the HTTP server alongside the background worker.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

use jobhub_core::config::AppConfig;
use jobhub_core::error::AppError;
use jobhub_core::retry::policy_from_config;
use jobhub_database::open_store;
use jobhub_worker::{CronScheduler, Dispatcher, HandlerRegistry, WorkerRunner};

use crate::middleware::cors::build_cors_layer;
use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.server.allowed_origins);

    build_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Open the store, start the worker and scheduler, and serve HTTP until a
/// shutdown signal arrives.
pub async fn run_server(config: AppConfig, registry: HandlerRegistry) -> Result<(), AppError> {
    tracing::info!("Starting JobHub v{}", env!("CARGO_PKG_VERSION"));

    let policy = policy_from_config(&config.worker.retry);
    tracing::info!(backend = %config.database.backend, "Opening job store...");
    let store = open_store(&config.database, policy).await?;

    tracing::info!(handlers = ?registry.registered_types(), "Handlers registered");
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&store),
        Arc::new(registry),
        &config.worker,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let worker_handle = if config.worker.enabled {
        let runner = WorkerRunner::new(Arc::clone(&dispatcher), &config.worker);
        let cancel = shutdown_rx.clone();
        Some(tokio::spawn(async move { runner.run(cancel).await }))
    } else {
        tracing::info!("Background worker disabled");
        None
    };

    let mut scheduler = if config.worker.schedules.is_empty() {
        None
    } else {
        let mut scheduler = CronScheduler::new(Arc::clone(&dispatcher)).await?;
        scheduler.register_configured(&config.worker).await?;
        scheduler.start().await?;
        Some(scheduler)
    };

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let state = AppState::new(Arc::new(config), store, dispatcher);
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("JobHub server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received, starting graceful shutdown...");
            let _ = shutdown_tx.send(true);
        })
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    if let Some(scheduler) = scheduler.as_mut() {
        if let Err(e) = scheduler.shutdown().await {
            tracing::warn!("Scheduler shutdown failed: {}", e);
        }
    }

    if let Some(handle) = worker_handle {
        tracing::info!("Waiting for the in-flight batch to settle...");
        if tokio::time::timeout(grace, handle).await.is_err() {
            tracing::warn!(
                grace_seconds = grace.as_secs(),
                "Worker did not stop within the grace period"
            );
        }
    }

    tracing::info!("JobHub server shut down gracefully");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
