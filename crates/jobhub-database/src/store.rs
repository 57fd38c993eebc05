//! The job store contract shared by every backend.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use jobhub_core::config::{DatabaseConfig, StoreBackend};
use jobhub_core::result::AppResult;
use jobhub_core::traits::{JobFailure, RetryDecision, RetryPolicy};
use jobhub_entity::job::{Job, JobStatus, NewJob, StatusCounts};

use crate::connection::DatabasePool;
use crate::memory::MemoryJobStore;
use crate::migration::run_migrations;
use crate::repositories::JobRepository;

/// `last_error` recorded when a lease lapses on a job's final attempt.
pub const LEASE_EXPIRED_ERROR: &str = "lease expired on final attempt";

/// Durable job records with atomic claim and outcome transitions.
///
/// Implementations must be safe to share between any number of
/// dispatchers. Every mutation is applied atomically per job: a failed call
/// never leaves a record half-transitioned.
#[async_trait]
pub trait JobStore: Send + Sync + std::fmt::Debug {
    /// Insert a new `pending` job.
    async fn enqueue(&self, job: NewJob) -> AppResult<Job>;

    /// Look up a single job.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Job>>;

    /// Jobs in `status`, most recently updated first.
    async fn list_by_status(&self, status: JobStatus, limit: i64) -> AppResult<Vec<Job>>;

    /// Claim up to `limit` eligible jobs for `lease_owner`.
    ///
    /// Eligible means `pending` with `available_at <= now`, or `processing`
    /// with an expired lease. Claimed jobs move to `processing`, get a lease
    /// of `lease` and have `attempts` incremented. Results are ordered by
    /// `available_at`, then `created_at`. Concurrent calls never return the
    /// same job. Expired leases on a job's final attempt are dead-lettered
    /// instead of claimed.
    async fn claim_batch(
        &self,
        queue: Option<&str>,
        limit: usize,
        lease_owner: &str,
        lease: Duration,
    ) -> AppResult<Vec<Job>>;

    /// Mark a job `completed`. Returns `false` if `lease_owner` no longer
    /// holds the job, in which case nothing changes.
    async fn report_success(&self, id: Uuid, lease_owner: &str) -> AppResult<bool>;

    /// Record a failed attempt and apply the retry policy.
    ///
    /// Returns the decision taken, or `None` if `lease_owner` no longer
    /// holds the job.
    async fn report_failure(
        &self,
        id: Uuid,
        lease_owner: &str,
        failure: &JobFailure,
    ) -> AppResult<Option<RetryDecision>>;

    /// Push the lease of a running job forward. Returns `false` if the lease
    /// was lost.
    async fn extend_lease(&self, id: Uuid, lease_owner: &str, lease: Duration) -> AppResult<bool>;

    /// Move `dead` jobs back to `pending` with `attempts = 0`.
    ///
    /// `None` targets every dead job. Ids that are unknown or not dead are
    /// skipped. Returns the number of jobs requeued.
    async fn requeue_dead(&self, ids: Option<&[Uuid]>) -> AppResult<u64>;

    /// Number of jobs per status.
    async fn status_counts(&self) -> AppResult<StatusCounts>;

    /// Number of claimable jobs per queue.
    async fn pending_by_queue(&self) -> AppResult<BTreeMap<String, i64>>;

    /// Jobs whose latest attempt failed, newest failure first.
    async fn recent_failures(&self, limit: i64) -> AppResult<Vec<Job>>;

    /// Age of the oldest claimable job, measured from `created_at`.
    async fn oldest_pending_age(&self) -> AppResult<Option<Duration>>;

    /// Check connectivity to the backing store.
    async fn health_check(&self) -> AppResult<bool>;
}

/// Open the store selected in configuration.
///
/// The PostgreSQL backend runs pending migrations first when
/// `database.run_migrations` is set.
pub async fn open_store(
    config: &DatabaseConfig,
    policy: Arc<dyn RetryPolicy>,
) -> AppResult<Arc<dyn JobStore>> {
    match config.backend {
        StoreBackend::Postgres => {
            let pool = DatabasePool::connect(config).await?;
            if config.run_migrations {
                run_migrations(pool.pool()).await?;
            }
            Ok(Arc::new(JobRepository::new(pool.into_pool(), policy)))
        }
        StoreBackend::Memory => {
            info!("Using in-memory job store; jobs are lost on restart");
            Ok(Arc::new(MemoryJobStore::new(policy)))
        }
    }
}
