//! PostgreSQL store checks. Skipped unless `DATABASE_URL` points at a
//! disposable database; the `jobs` table is truncated between cases.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use jobhub_core::config::DatabaseConfig;
use jobhub_core::retry::FixedDelay;
use jobhub_core::traits::{JobFailure, RetryDecision};
use jobhub_database::migration::run_migrations;
use jobhub_database::{DatabasePool, JobRepository, JobStore};
use jobhub_entity::job::{JobStatus, NewJob};
use tokio::sync::Mutex;

static SERIAL: Mutex<()> = Mutex::const_new(());

async fn repository() -> Option<JobRepository> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let config = DatabaseConfig {
        url,
        max_connections: 8,
        min_connections: 1,
        ..DatabaseConfig::default()
    };
    let pool = DatabasePool::connect(&config).await.unwrap();
    run_migrations(pool.pool()).await.unwrap();
    sqlx::query("TRUNCATE jobs").execute(pool.pool()).await.unwrap();
    Some(JobRepository::new(pool.into_pool(), Arc::new(FixedDelay::immediate())))
}

fn new_job(max_attempts: i32) -> NewJob {
    NewJob::new("contact.sync", "crm", serde_json::json!({"contact": 42}), max_attempts)
}

#[tokio::test]
async fn test_postgres_lifecycle() {
    let _guard = SERIAL.lock().await;
    let Some(repo) = repository().await else {
        return;
    };

    let job = repo.enqueue(new_job(2)).await.unwrap();
    assert_eq!(job.status, JobStatus::Pending);

    let claimed = repo
        .claim_batch(Some("crm"), 10, "w1", Duration::from_secs(60))
        .await
        .unwrap();
    assert_eq!(claimed.len(), 1);
    assert_eq!(claimed[0].attempts, 1);

    assert!(!repo.report_success(job.id, "w2").await.unwrap());
    let decision = repo
        .report_failure(job.id, "w1", &JobFailure::transient("crm unavailable"))
        .await
        .unwrap();
    assert_eq!(decision, Some(RetryDecision::Requeue { delay: Duration::ZERO }));

    repo.claim_batch(None, 10, "w1", Duration::from_secs(60))
        .await
        .unwrap();
    let decision = repo
        .report_failure(job.id, "w1", &JobFailure::transient("crm unavailable"))
        .await
        .unwrap();
    assert_eq!(decision, Some(RetryDecision::DeadLetter));

    let counts = repo.status_counts().await.unwrap();
    assert_eq!(counts.dead, 1);
    assert_eq!(repo.recent_failures(5).await.unwrap().len(), 1);

    assert_eq!(repo.requeue_dead(Some(&[job.id])).await.unwrap(), 1);
    let revived = repo.find_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(revived.status, JobStatus::Pending);
    assert_eq!(revived.attempts, 0);
    assert_eq!(repo.pending_by_queue().await.unwrap().get("crm"), Some(&1));
    assert!(repo.oldest_pending_age().await.unwrap().is_some());
}

#[tokio::test]
async fn test_postgres_concurrent_claims_are_disjoint() {
    let _guard = SERIAL.lock().await;
    let Some(repo) = repository().await else {
        return;
    };

    for _ in 0..50 {
        repo.enqueue(new_job(3)).await.unwrap();
    }

    let claims = futures::future::join_all((0..5).map(|n| {
        let repo = repo.clone();
        async move {
            repo.claim_batch(None, 20, &format!("w{n}"), Duration::from_secs(60))
                .await
                .unwrap()
        }
    }))
    .await;

    let ids: Vec<_> = claims.into_iter().flatten().map(|j| j.id).collect();
    let unique: HashSet<_> = ids.iter().collect();
    assert_eq!(ids.len(), unique.len());
    assert_eq!(ids.len(), 50);
}

#[tokio::test]
async fn test_postgres_terminal_jobs_are_immutable() {
    let _guard = SERIAL.lock().await;
    let Some(repo) = repository().await else {
        return;
    };
    let lease = Duration::from_secs(60);

    let done = repo.enqueue(new_job(3)).await.unwrap();
    let dead = repo.enqueue(new_job(3)).await.unwrap();
    repo.claim_batch(None, 2, "w1", lease).await.unwrap();
    assert!(repo.report_success(done.id, "w1").await.unwrap());
    let decision = repo
        .report_failure(dead.id, "w1", &JobFailure::permanent("contact deleted"))
        .await
        .unwrap();
    assert_eq!(decision, Some(RetryDecision::DeadLetter));

    let done_before = repo.find_by_id(done.id).await.unwrap().unwrap();
    let dead_before = repo.find_by_id(dead.id).await.unwrap().unwrap();

    for id in [done.id, dead.id] {
        assert!(!repo.report_success(id, "w1").await.unwrap());
        let late = JobFailure::transient("late report");
        assert_eq!(repo.report_failure(id, "w1", &late).await.unwrap(), None);
        assert!(!repo.extend_lease(id, "w1", lease).await.unwrap());
    }
    assert!(repo.claim_batch(None, 10, "w2", lease).await.unwrap().is_empty());
    assert_eq!(repo.requeue_dead(Some(&[done.id])).await.unwrap(), 0);

    assert_eq!(repo.find_by_id(done.id).await.unwrap().unwrap(), done_before);
    assert_eq!(repo.find_by_id(dead.id).await.unwrap().unwrap(), dead_before);

    assert_eq!(repo.requeue_dead(None).await.unwrap(), 1);
    let revived = repo.find_by_id(dead.id).await.unwrap().unwrap();
    assert_eq!(revived.status, JobStatus::Pending);
    assert_eq!(repo.find_by_id(done.id).await.unwrap().unwrap(), done_before);
}
