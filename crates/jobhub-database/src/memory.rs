//! In-memory job store using a Tokio mutex for single-node deployments.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use jobhub_core::result::AppResult;
use jobhub_core::traits::{JobFailure, RetryDecision, RetryPolicy};
use jobhub_entity::job::{Job, JobStatus, NewJob, StatusCounts};

use crate::store::{JobStore, LEASE_EXPIRED_ERROR};

/// `now + d`, saturating at the largest representable instant.
fn after(now: DateTime<Utc>, d: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(d)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// In-memory job store.
///
/// Every operation runs under one mutex, which gives claims the same
/// all-or-nothing, non-overlapping guarantees as the PostgreSQL store.
/// Suitable for single-process deployments and tests only.
#[derive(Debug, Clone)]
pub struct MemoryJobStore {
    jobs: Arc<Mutex<HashMap<Uuid, Job>>>,
    policy: Arc<dyn RetryPolicy>,
}

impl MemoryJobStore {
    /// Creates an empty store applying `policy` to failures.
    pub fn new(policy: Arc<dyn RetryPolicy>) -> Self {
        Self {
            jobs: Arc::new(Mutex::new(HashMap::new())),
            policy,
        }
    }

    /// Number of stored jobs, in any status.
    pub async fn len(&self) -> usize {
        self.jobs.lock().await.len()
    }

    /// Whether the store holds no jobs.
    pub async fn is_empty(&self) -> bool {
        self.jobs.lock().await.is_empty()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn enqueue(&self, job: NewJob) -> AppResult<Job> {
        job.validate()?;
        let created = Job::from_new(job, Utc::now());

        self.jobs.lock().await.insert(created.id, created.clone());
        debug!(
            job_id = %created.id,
            job_type = %created.job_type,
            queue = %created.queue,
            "Enqueued job"
        );
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Job>> {
        Ok(self.jobs.lock().await.get(&id).cloned())
    }

    async fn list_by_status(&self, status: JobStatus, limit: i64) -> AppResult<Vec<Job>> {
        let jobs = self.jobs.lock().await;
        let mut matching: Vec<Job> = jobs.values().filter(|j| j.status == status).cloned().collect();
        matching.sort_by(|a, b| (b.updated_at, b.id).cmp(&(a.updated_at, a.id)));
        matching.truncate(limit.max(0) as usize);
        Ok(matching)
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

        let now = Utc::now();
        let mut jobs = self.jobs.lock().await;
        let in_queue = |job: &Job| queue.is_none_or(|q| job.queue == q);

        let mut abandoned = 0;
        for job in jobs.values_mut() {
            if in_queue(&*job) && job.lease_expired(now) && job.attempts >= job.max_attempts {
                job.status = JobStatus::Dead;
                job.last_error = Some(LEASE_EXPIRED_ERROR.to_string());
                job.failed_at = Some(now);
                job.dead_at = Some(now);
                job.lease_owner = None;
                job.leased_until = None;
                job.updated_at = now;
                abandoned += 1;
            }
        }
        if abandoned > 0 {
            warn!(count = abandoned, "Dead-lettered jobs whose final lease expired");
        }

        let mut candidates: Vec<(DateTime<Utc>, DateTime<Utc>, Uuid)> = jobs
            .values()
            .filter(|job| in_queue(job) && job.is_claimable(now))
            .map(|job| (job.available_at, job.created_at, job.id))
            .collect();
        candidates.sort();
        candidates.truncate(limit);

        let leased_until = after(now, lease);
        let mut claimed = Vec::with_capacity(candidates.len());
        for (_, _, id) in candidates {
            if let Some(job) = jobs.get_mut(&id) {
                job.status = JobStatus::Processing;
                job.attempts += 1;
                job.lease_owner = Some(lease_owner.to_string());
                job.leased_until = Some(leased_until);
                job.claimed_at = Some(now);
                job.updated_at = now;
                claimed.push(job.clone());
            }
        }
        Ok(claimed)
    }

    async fn report_success(&self, id: Uuid, lease_owner: &str) -> AppResult<bool> {
        let now = Utc::now();
        let mut jobs = self.jobs.lock().await;
        let Some(job) = jobs.get_mut(&id).filter(|j| j.is_leased_by(lease_owner)) else {
            return Ok(false);
        };

        job.status = JobStatus::Completed;
        job.last_error = None;
        job.completed_at = Some(now);
        job.lease_owner = None;
        job.leased_until = None;
        job.updated_at = now;
        Ok(true)
    }

    async fn report_failure(
        &self,
        id: Uuid,
        lease_owner: &str,
        failure: &JobFailure,
    ) -> AppResult<Option<RetryDecision>> {
        let now = Utc::now();
        let mut jobs = self.jobs.lock().await;
        let Some(job) = jobs.get_mut(&id).filter(|j| j.is_leased_by(lease_owner)) else {
            return Ok(None);
        };

        let decision = self.policy.decide(job.attempts, job.max_attempts, failure);
        match decision {
            RetryDecision::Requeue { delay } => {
                job.status = JobStatus::Pending;
                job.available_at = after(now, delay);
            }
            RetryDecision::DeadLetter => {
                job.status = JobStatus::Dead;
                job.dead_at = Some(now);
            }
        }
        job.last_error = Some(failure.message.clone());
        job.failed_at = Some(now);
        job.lease_owner = None;
        job.leased_until = None;
        job.updated_at = now;
        Ok(Some(decision))
    }

    async fn extend_lease(&self, id: Uuid, lease_owner: &str, lease: Duration) -> AppResult<bool> {
        let now = Utc::now();
        let mut jobs = self.jobs.lock().await;
        let Some(job) = jobs.get_mut(&id).filter(|j| j.is_leased_by(lease_owner)) else {
            return Ok(false);
        };

        job.leased_until = Some(after(now, lease));
        job.updated_at = now;
        Ok(true)
    }

    async fn requeue_dead(&self, ids: Option<&[Uuid]>) -> AppResult<u64> {
        let now = Utc::now();
        let mut jobs = self.jobs.lock().await;
        let mut requeued = 0;

        for job in jobs.values_mut() {
            if job.status != JobStatus::Dead {
                continue;
            }
            if ids.is_some_and(|ids| !ids.contains(&job.id)) {
                continue;
            }
            job.status = JobStatus::Pending;
            job.attempts = 0;
            job.last_error = None;
            job.available_at = now;
            job.lease_owner = None;
            job.leased_until = None;
            job.updated_at = now;
            requeued += 1;
        }
        Ok(requeued)
    }

    async fn status_counts(&self) -> AppResult<StatusCounts> {
        let jobs = self.jobs.lock().await;
        let mut counts = StatusCounts::default();
        for job in jobs.values() {
            counts.add(job.status, 1);
        }
        Ok(counts)
    }

    async fn pending_by_queue(&self) -> AppResult<BTreeMap<String, i64>> {
        let now = Utc::now();
        let jobs = self.jobs.lock().await;
        let mut by_queue = BTreeMap::new();
        for job in jobs.values().filter(|j| j.is_claimable(now)) {
            *by_queue.entry(job.queue.clone()).or_insert(0) += 1;
        }
        Ok(by_queue)
    }

    async fn recent_failures(&self, limit: i64) -> AppResult<Vec<Job>> {
        let jobs = self.jobs.lock().await;
        let mut failed: Vec<Job> = jobs
            .values()
            .filter(|j| j.last_error.is_some())
            .cloned()
            .collect();
        failed.sort_by(|a, b| (b.last_failure_at(), b.id).cmp(&(a.last_failure_at(), a.id)));
        failed.truncate(limit.max(0) as usize);
        Ok(failed)
    }

    async fn oldest_pending_age(&self) -> AppResult<Option<Duration>> {
        let now = Utc::now();
        let jobs = self.jobs.lock().await;
        let oldest = jobs
            .values()
            .filter(|j| j.is_claimable(now))
            .map(|j| j.created_at)
            .min();

        Ok(oldest.map(|created| (now - created).to_std().unwrap_or(Duration::ZERO)))
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}
