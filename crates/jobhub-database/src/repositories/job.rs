//! PostgreSQL job store.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, warn};
use uuid::Uuid;

use jobhub_core::error::{AppError, ErrorKind};
use jobhub_core::result::AppResult;
use jobhub_core::traits::{JobFailure, RetryDecision, RetryPolicy};
use jobhub_entity::job::{Job, JobStatus, NewJob, StatusCounts};

use crate::store::{JobStore, LEASE_EXPIRED_ERROR};

/// Shared eligibility predicate for claims and backlog reporting.
const CLAIMABLE: &str = "((status = 'pending' AND available_at <= NOW()) \
     OR (status = 'processing' AND leased_until < NOW()))";

fn db_err(message: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::Database, message, e)
}

/// Repository for background job queue operations.
///
/// Claims use `FOR UPDATE SKIP LOCKED` so concurrent workers skip rows
/// another transaction is already claiming instead of blocking on them.
#[derive(Debug, Clone)]
pub struct JobRepository {
    pool: PgPool,
    policy: Arc<dyn RetryPolicy>,
}

impl JobRepository {
    /// Create a new job repository.
    pub fn new(pool: PgPool, policy: Arc<dyn RetryPolicy>) -> Self {
        Self { pool, policy }
    }

    /// Return the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl JobStore for JobRepository {
    async fn enqueue(&self, job: NewJob) -> AppResult<Job> {
        job.validate()?;

        let created = sqlx::query_as::<_, Job>(
            "INSERT INTO jobs (id, queue, job_type, payload, max_attempts, available_at) \
             VALUES ($1, $2, $3, $4, $5, COALESCE($6, NOW())) RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(&job.queue)
        .bind(&job.job_type)
        .bind(&job.payload)
        .bind(job.max_attempts)
        .bind(job.run_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err("Failed to enqueue job"))?;

        debug!(
            job_id = %created.id,
            job_type = %created.job_type,
            queue = %created.queue,
            "Enqueued job"
        );
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to find job"))
    }

    async fn list_by_status(&self, status: JobStatus, limit: i64) -> AppResult<Vec<Job>> {
        sqlx::query_as::<_, Job>(
            "SELECT * FROM jobs WHERE status = $1 ORDER BY updated_at DESC, id DESC LIMIT $2",
        )
        .bind(status)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list jobs"))
    }

    async fn claim_batch(
        &self,
        queue: Option<&str>,
        limit: usize,
        lease_owner: &str,
        lease: Duration,
    ) -> AppResult<Vec<Job>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("Failed to begin claim transaction"))?;

        let abandoned = sqlx::query(
            "UPDATE jobs SET status = 'dead', last_error = $2, failed_at = NOW(), dead_at = NOW(), \
             lease_owner = NULL, leased_until = NULL, updated_at = NOW() \
             WHERE id IN ( \
                SELECT id FROM jobs \
                WHERE status = 'processing' AND leased_until < NOW() \
                AND attempts >= max_attempts \
                AND ($1::text IS NULL OR queue = $1) \
                FOR UPDATE SKIP LOCKED \
             )",
        )
        .bind(queue)
        .bind(LEASE_EXPIRED_ERROR)
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to dead-letter abandoned jobs"))?
        .rows_affected();

        if abandoned > 0 {
            warn!(count = abandoned, "Dead-lettered jobs whose final lease expired");
        }

        let claim_sql = format!(
            "WITH candidates AS ( \
                SELECT id FROM jobs \
                WHERE ($1::text IS NULL OR queue = $1) AND {CLAIMABLE} \
                ORDER BY available_at ASC, created_at ASC \
                LIMIT $2 \
                FOR UPDATE SKIP LOCKED \
             ) \
             UPDATE jobs AS j SET status = 'processing', attempts = j.attempts + 1, \
                lease_owner = $3, leased_until = NOW() + make_interval(secs => $4), \
                claimed_at = NOW(), updated_at = NOW() \
             FROM candidates WHERE j.id = candidates.id \
             RETURNING j.*"
        );

        let mut claimed = sqlx::query_as::<_, Job>(&claim_sql)
            .bind(queue)
            .bind(limit as i64)
            .bind(lease_owner)
            .bind(lease.as_secs_f64())
            .fetch_all(&mut *tx)
            .await
            .map_err(db_err("Failed to claim jobs"))?;

        tx.commit()
            .await
            .map_err(db_err("Failed to commit claim transaction"))?;

        // RETURNING does not preserve the candidate ordering.
        claimed.sort_by(|a, b| {
            (a.available_at, a.created_at, a.id).cmp(&(b.available_at, b.created_at, b.id))
        });
        Ok(claimed)
    }

    async fn report_success(&self, id: Uuid, lease_owner: &str) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'completed', last_error = NULL, completed_at = NOW(), \
             lease_owner = NULL, leased_until = NULL, updated_at = NOW() \
             WHERE id = $1 AND status = 'processing' AND lease_owner = $2",
        )
        .bind(id)
        .bind(lease_owner)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to complete job"))?;

        Ok(result.rows_affected() == 1)
    }

    async fn report_failure(
        &self,
        id: Uuid,
        lease_owner: &str,
        failure: &JobFailure,
    ) -> AppResult<Option<RetryDecision>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("Failed to begin failure transaction"))?;

        let row = sqlx::query_as::<_, (i32, i32)>(
            "SELECT attempts, max_attempts FROM jobs \
             WHERE id = $1 AND status = 'processing' AND lease_owner = $2 \
             FOR UPDATE",
        )
        .bind(id)
        .bind(lease_owner)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err("Failed to load job for failure"))?;

        let Some((attempts, max_attempts)) = row else {
            return Ok(None);
        };

        let decision = self.policy.decide(attempts, max_attempts, failure);
        match decision {
            RetryDecision::Requeue { delay } => {
                sqlx::query(
                    "UPDATE jobs SET status = 'pending', last_error = $2, failed_at = NOW(), \
                     available_at = NOW() + make_interval(secs => $3), \
                     lease_owner = NULL, leased_until = NULL, updated_at = NOW() \
                     WHERE id = $1",
                )
                .bind(id)
                .bind(&failure.message)
                .bind(delay.as_secs_f64())
                .execute(&mut *tx)
                .await
                .map_err(db_err("Failed to requeue job"))?;
            }
            RetryDecision::DeadLetter => {
                sqlx::query(
                    "UPDATE jobs SET status = 'dead', last_error = $2, failed_at = NOW(), \
                     dead_at = NOW(), lease_owner = NULL, leased_until = NULL, updated_at = NOW() \
                     WHERE id = $1",
                )
                .bind(id)
                .bind(&failure.message)
                .execute(&mut *tx)
                .await
                .map_err(db_err("Failed to dead-letter job"))?;
            }
        }

        tx.commit()
            .await
            .map_err(db_err("Failed to commit failure transaction"))?;

        Ok(Some(decision))
    }

    async fn extend_lease(&self, id: Uuid, lease_owner: &str, lease: Duration) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE jobs SET leased_until = NOW() + make_interval(secs => $3), updated_at = NOW() \
             WHERE id = $1 AND status = 'processing' AND lease_owner = $2",
        )
        .bind(id)
        .bind(lease_owner)
        .bind(lease.as_secs_f64())
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to extend lease"))?;

        Ok(result.rows_affected() == 1)
    }

    async fn requeue_dead(&self, ids: Option<&[Uuid]>) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'pending', attempts = 0, last_error = NULL, \
             available_at = NOW(), lease_owner = NULL, leased_until = NULL, updated_at = NOW() \
             WHERE status = 'dead' AND ($1::uuid[] IS NULL OR id = ANY($1))",
        )
        .bind(ids.map(<[Uuid]>::to_vec))
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to requeue dead jobs"))?;

        Ok(result.rows_affected())
    }

    async fn status_counts(&self) -> AppResult<StatusCounts> {
        let rows = sqlx::query_as::<_, (JobStatus, i64)>(
            "SELECT status, COUNT(*) FROM jobs GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to count jobs by status"))?;

        let mut counts = StatusCounts::default();
        for (status, count) in rows {
            counts.add(status, count);
        }
        Ok(counts)
    }

    async fn pending_by_queue(&self) -> AppResult<BTreeMap<String, i64>> {
        let sql = format!("SELECT queue, COUNT(*) FROM jobs WHERE {CLAIMABLE} GROUP BY queue");
        let rows = sqlx::query_as::<_, (String, i64)>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("Failed to count pending jobs by queue"))?;

        Ok(rows.into_iter().collect())
    }

    async fn recent_failures(&self, limit: i64) -> AppResult<Vec<Job>> {
        sqlx::query_as::<_, Job>(
            "SELECT * FROM jobs WHERE last_error IS NOT NULL \
             ORDER BY COALESCE(dead_at, failed_at) DESC NULLS LAST, id DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list recent failures"))
    }

    async fn oldest_pending_age(&self) -> AppResult<Option<Duration>> {
        let sql = format!(
            "SELECT (EXTRACT(EPOCH FROM (NOW() - MIN(created_at))) * 1000)::BIGINT \
             FROM jobs WHERE {CLAIMABLE}"
        );
        let age_ms: Option<i64> = sqlx::query_scalar(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err("Failed to compute oldest pending age"))?;

        Ok(age_ms.map(|ms| Duration::from_millis(ms.max(0) as u64)))
    }

    async fn health_check(&self) -> AppResult<bool> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|v| v == 1)
            .map_err(db_err("Health check failed"))
    }
}
