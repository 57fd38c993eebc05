//! Integration tests for health endpoints.

use axum::http::StatusCode;

use crate::helpers::TestApp;

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();

    let response = app.request("GET", "/api/health", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], "ok");
}

#[tokio::test]
async fn test_health_detailed_lists_handlers() {
    let app = TestApp::new();

    let response = app.request("GET", "/api/health/detailed", None).await;

    assert_eq!(response.status, StatusCode::OK);
    let data = &response.body["data"];
    assert_eq!(data["backend"], "memory");
    assert_eq!(data["database"], "connected");
    assert_eq!(data["worker_id"], "test-worker");
    assert_eq!(
        data["handlers"],
        serde_json::json!(["contact.sync", "email.send", "webhook.deliver"])
    );
}

#[tokio::test]
async fn test_unknown_route() {
    let app = TestApp::new();

    let response = app.request("GET", "/api/nope", None).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
