//! Integration tests for queue administration.

use axum::http::StatusCode;
use jobhub_entity::job::JobStatus;

use crate::helpers::TestApp;

#[tokio::test]
async fn test_run_settles_every_outcome() {
    let app = TestApp::new();
    let ok = app.enqueue("email.send", 2).await;
    let flaky = app.enqueue("webhook.deliver", 2).await;
    let broken = app.enqueue("contact.sync", 2).await;

    let report = app.run_worker(10).await;
    assert_eq!(report["processed_count"], 3);
    assert_eq!(report["succeeded"], 1);
    assert_eq!(report["retried"], 1);
    assert_eq!(report["dead_lettered"], 1);
    assert_eq!(report["lost_leases"], 0);

    let job = app.store.find_by_id(ok).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.last_error.is_none());

    let job = app.store.find_by_id(flaky).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.attempts, 1);
    assert_eq!(
        job.last_error.as_deref(),
        Some("upstream returned 503 on attempt 1")
    );

    let job = app.store.find_by_id(broken).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Dead);
    assert_eq!(job.last_error.as_deref(), Some("contact does not exist"));

    // Second attempt exhausts the flaky job's budget.
    let report = app.run_worker(10).await;
    assert_eq!(report["processed_count"], 1);
    assert_eq!(report["dead_lettered"], 1);

    let job = app.store.find_by_id(flaky).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Dead);
    assert_eq!(job.attempts, 2);

    let report = app.run_worker(10).await;
    assert_eq!(report["processed_count"], 0);
}

#[tokio::test]
async fn test_run_rejects_zero_batch() {
    let app = TestApp::new();

    let response = app
        .request(
            "POST",
            "/api/admin/queue/run",
            Some(serde_json::json!({ "batch_size": 0 })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_status_reports_backlog() {
    let app = TestApp::new();
    app.enqueue("email.send", 3).await;
    app.enqueue("contact.sync", 3).await;
    app.enqueue("email.send", 3).await;

    let response = app.request("GET", "/api/admin/queue/status", None).await;
    assert_eq!(response.status, StatusCode::OK);
    let data = &response.body["data"];
    assert_eq!(data["status_counts"]["pending"], 3);
    assert_eq!(data["pending_by_queue"]["default"], 3);
    assert!(data["oldest_pending_age_ms"].as_i64().unwrap() >= 0);
    assert_eq!(data["recent_failures"], serde_json::json!([]));

    app.run_worker(10).await;

    let response = app
        .request("GET", "/api/admin/queue/status?recent_failures=5", None)
        .await;
    let data = &response.body["data"];
    assert_eq!(data["status_counts"]["pending"], 0);
    assert_eq!(data["status_counts"]["completed"], 2);
    assert_eq!(data["status_counts"]["dead"], 1);
    assert!(data["oldest_pending_age_ms"].is_null());

    let failures = data["recent_failures"].as_array().unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0]["job_type"], "contact.sync");
    assert_eq!(failures[0]["last_error"], "contact does not exist");
}

#[tokio::test]
async fn test_retry_selected_dead_jobs() {
    let app = TestApp::new();
    let first = app.enqueue("contact.sync", 1).await;
    let second = app.enqueue("contact.sync", 1).await;
    app.run_worker(10).await;

    let response = app
        .request(
            "POST",
            "/api/admin/queue/dead/retry",
            Some(serde_json::json!({ "job_ids": [first], "requested_by": "ops" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["retried_count"], 1);

    let job = app.store.find_by_id(first).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.attempts, 0);

    let job = app.store.find_by_id(second).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Dead);
}

#[tokio::test]
async fn test_retry_all_dead_jobs() {
    let app = TestApp::new();
    app.enqueue("contact.sync", 1).await;
    app.enqueue("contact.sync", 1).await;
    let done = app.enqueue("email.send", 1).await;
    app.run_worker(10).await;

    let response = app
        .request("POST", "/api/admin/queue/dead/retry", Some(serde_json::json!({})))
        .await;
    assert_eq!(response.body["data"]["retried_count"], 2);

    let job = app.store.find_by_id(done).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);

    // Nothing left to retry.
    let response = app
        .request("POST", "/api/admin/queue/dead/retry", Some(serde_json::json!({})))
        .await;
    assert_eq!(response.body["data"]["retried_count"], 0);
}

#[tokio::test]
async fn test_retry_empty_list_is_noop() {
    let app = TestApp::new();
    app.enqueue("contact.sync", 1).await;
    app.run_worker(10).await;

    let response = app
        .request(
            "POST",
            "/api/admin/queue/dead/retry",
            Some(serde_json::json!({ "job_ids": [] })),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["retried_count"], 0);
}

#[tokio::test]
async fn test_list_dead_jobs() {
    let app = TestApp::new();
    let dead = app.enqueue("contact.sync", 1).await;
    app.enqueue("email.send", 1).await;
    app.run_worker(10).await;

    let response = app.request("GET", "/api/admin/queue/dead?limit=10", None).await;

    assert_eq!(response.status, StatusCode::OK);
    let jobs = response.body["data"].as_array().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["id"], dead.to_string());
    assert_eq!(jobs[0]["status"], "dead");
}

#[tokio::test]
async fn test_get_job() {
    let app = TestApp::new();
    let id = app.enqueue("email.send", 3).await;

    let response = app
        .request("GET", &format!("/api/admin/queue/jobs/{id}"), None)
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["job_type"], "email.send");
    assert_eq!(response.body["data"]["status"], "pending");
}

#[tokio::test]
async fn test_get_job_not_found() {
    let app = TestApp::new();

    let response = app
        .request(
            "GET",
            "/api/admin/queue/jobs/00000000-0000-0000-0000-999999999999",
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_job_invalid_id() {
    let app = TestApp::new();

    let response = app
        .request("GET", "/api/admin/queue/jobs/not-a-uuid", None)
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}
