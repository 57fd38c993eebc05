//! Shared test helpers for integration tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use jobhub_api::{AppState, build_app};
use jobhub_core::config::{AppConfig, StoreBackend};
use jobhub_core::retry::FixedDelay;
use jobhub_database::{JobStore, MemoryJobStore};
use jobhub_worker::{Dispatcher, HandlerError, HandlerRegistry, JobContext, JobHandler};

/// Succeeds on every attempt.
#[derive(Debug)]
pub struct SucceedingHandler;

#[async_trait]
impl JobHandler for SucceedingHandler {
    fn job_type(&self) -> &str {
        "email.send"
    }

    async fn handle(&self, _ctx: &JobContext) -> Result<(), HandlerError> {
        Ok(())
    }
}

/// Fails transiently on every attempt.
#[derive(Debug)]
pub struct FlakyHandler;

#[async_trait]
impl JobHandler for FlakyHandler {
    fn job_type(&self) -> &str {
        "webhook.deliver"
    }

    async fn handle(&self, ctx: &JobContext) -> Result<(), HandlerError> {
        Err(HandlerError::transient(format!(
            "upstream returned 503 on attempt {}",
            ctx.attempt()
        )))
    }
}

/// Rejects its payload outright.
#[derive(Debug)]
pub struct RejectingHandler;

#[async_trait]
impl JobHandler for RejectingHandler {
    fn job_type(&self) -> &str {
        "contact.sync"
    }

    async fn handle(&self, _ctx: &JobContext) -> Result<(), HandlerError> {
        Err(HandlerError::permanent("contact does not exist"))
    }
}

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Store shared with the router, for direct inspection
    pub store: Arc<dyn JobStore>,
}

impl TestApp {
    /// App backed by a fresh memory store that retries failures immediately.
    pub fn new() -> Self {
        let mut config = AppConfig::default();
        config.database.backend = StoreBackend::Memory;
        config.worker.worker_id = "test-worker".to_string();
        config.worker.enabled = false;

        let store: Arc<dyn JobStore> =
            Arc::new(MemoryJobStore::new(Arc::new(FixedDelay::immediate())));

        let registry = HandlerRegistry::new()
            .with(Arc::new(SucceedingHandler))
            .with(Arc::new(FlakyHandler))
            .with(Arc::new(RejectingHandler));

        let dispatcher = Arc::new(
            Dispatcher::new(Arc::clone(&store), Arc::new(registry), &config.worker)
                .with_lease(Duration::from_secs(30)),
        );

        let state = AppState::new(Arc::new(config), Arc::clone(&store), dispatcher);

        Self {
            router: build_app(state),
            store,
        }
    }

    /// Submit a job through the API and return its id.
    pub async fn enqueue(&self, job_type: &str, max_attempts: i32) -> Uuid {
        let response = self
            .request(
                "POST",
                "/api/jobs",
                Some(serde_json::json!({
                    "job_type": job_type,
                    "payload": { "to": "ops@example.com" },
                    "max_attempts": max_attempts,
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);

        response.body["data"]["id"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .expect("enqueue response carries a job id")
    }

    /// Run one dispatch cycle through the admin endpoint.
    pub async fn run_worker(&self, batch_size: usize) -> Value {
        let response = self
            .request(
                "POST",
                "/api/admin/queue/run",
                Some(serde_json::json!({ "batch_size": batch_size })),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
        response.body["data"].clone()
    }

    /// Make an HTTP request to the test app
    pub async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}
