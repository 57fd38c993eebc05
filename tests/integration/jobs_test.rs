//! Integration tests for job submission.

use axum::http::StatusCode;
use jobhub_entity::job::JobStatus;

use crate::helpers::TestApp;

#[tokio::test]
async fn test_enqueue_creates_pending_job() {
    let app = TestApp::new();

    let id = app.enqueue("email.send", 5).await;

    let job = app
        .store
        .find_by_id(id)
        .await
        .unwrap()
        .expect("job was stored");
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.queue, "default");
    assert_eq!(job.attempts, 0);
    assert_eq!(job.max_attempts, 5);
    assert_eq!(job.payload["to"], "ops@example.com");
}

#[tokio::test]
async fn test_enqueue_uses_configured_defaults() {
    let app = TestApp::new();

    let response = app
        .request(
            "POST",
            "/api/jobs",
            Some(serde_json::json!({ "job_type": "email.send", "queue": "mail" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);

    let id = response.body["data"]["id"].as_str().unwrap().parse().unwrap();
    let job = app.store.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(job.queue, "mail");
    assert_eq!(job.max_attempts, 3);
}

#[tokio::test]
async fn test_enqueue_rejects_empty_job_type() {
    let app = TestApp::new();

    let response = app
        .request(
            "POST",
            "/api/jobs",
            Some(serde_json::json!({ "job_type": "" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_enqueue_rejects_zero_attempts() {
    let app = TestApp::new();

    let response = app
        .request(
            "POST",
            "/api/jobs",
            Some(serde_json::json!({ "job_type": "email.send", "max_attempts": 0 })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_enqueue_rejects_malformed_body() {
    let app = TestApp::new();

    let response = app
        .request("POST", "/api/jobs", Some(serde_json::json!({ "payload": {} })))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}
