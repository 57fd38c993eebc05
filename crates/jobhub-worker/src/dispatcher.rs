//! Claims a batch of jobs and settles every one of them.
//!
//! The polling runner, the cron scheduler and the admin endpoint all drive
//! the same [`Dispatcher::run`]. Each claimed job runs in its own task so a
//! panicking or hanging handler cannot take the rest of the batch down.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinError;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use jobhub_core::config::WorkerConfig;
use jobhub_core::result::AppResult;
use jobhub_core::traits::{JobFailure, RetryDecision};
use jobhub_database::JobStore;
use jobhub_entity::job::Job;

use crate::executor::{HandlerRegistry, JobContext};

/// Floor for the heartbeat period so tiny leases cannot spin the loop.
const MIN_HEARTBEAT: Duration = Duration::from_millis(10);

/// Per-outcome tally of one dispatch cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    /// Jobs claimed and attempted, whatever their outcome.
    pub processed_count: usize,
    /// Jobs that completed.
    pub succeeded: usize,
    /// Jobs returned to `pending` for another attempt.
    pub retried: usize,
    /// Jobs moved to `dead`.
    pub dead_lettered: usize,
    /// Jobs whose outcome could not be recorded under this run's lease.
    pub lost_leases: usize,
}

impl DispatchReport {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Succeeded => self.succeeded += 1,
            Outcome::Retried => self.retried += 1,
            Outcome::DeadLettered => self.dead_lettered += 1,
            Outcome::LostLease => self.lost_leases += 1,
        }
    }

    /// Whether the cycle found nothing to do.
    pub fn is_idle(&self) -> bool {
        self.processed_count == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Succeeded,
    Retried,
    DeadLettered,
    LostLease,
}

/// Claims jobs from a [`JobStore`] and runs them through registered handlers.
#[derive(Debug)]
pub struct Dispatcher {
    store: Arc<dyn JobStore>,
    registry: Arc<HandlerRegistry>,
    worker_id: String,
    lease: Duration,
    concurrency: usize,
    runs: AtomicU64,
}

impl Dispatcher {
    /// Create a dispatcher. An empty `worker.worker_id` gets a random one.
    pub fn new(
        store: Arc<dyn JobStore>,
        registry: Arc<HandlerRegistry>,
        config: &WorkerConfig,
    ) -> Self {
        let worker_id = if config.worker_id.trim().is_empty() {
            format!("worker-{}", Uuid::new_v4().simple())
        } else {
            config.worker_id.clone()
        };

        Self {
            store,
            registry,
            worker_id,
            lease: Duration::from_secs(config.lease_seconds),
            concurrency: config.concurrency.max(1),
            runs: AtomicU64::new(0),
        }
    }

    /// Override the lease length.
    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    /// Identifier of this dispatcher.
    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Lease taken on every claimed job.
    pub fn lease(&self) -> Duration {
        self.lease
    }

    /// Registered handlers.
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Claim up to `batch_size` jobs and run them to a recorded outcome.
    ///
    /// Returns once every claimed job has settled. Only a failed claim is an
    /// error; handler failures are applied to the job records and counted in
    /// the report.
    pub async fn run(&self, batch_size: usize, queue: Option<&str>) -> AppResult<DispatchReport> {
        // Each run leases under its own owner so a stale attempt from an
        // earlier run of this dispatcher cannot settle a reclaimed job.
        let run = self.runs.fetch_add(1, Ordering::Relaxed) + 1;
        let owner: Arc<str> = Arc::from(format!("{}#{run}", self.worker_id));

        let jobs = self
            .store
            .claim_batch(queue, batch_size, &owner, self.lease)
            .await?;

        let mut report = DispatchReport {
            processed_count: jobs.len(),
            ..DispatchReport::default()
        };
        if jobs.is_empty() {
            debug!(worker_id = %owner, queue = queue.unwrap_or("*"), "No jobs available");
            return Ok(report);
        }

        info!(
            worker_id = %owner,
            queue = queue.unwrap_or("*"),
            claimed = jobs.len(),
            "Claimed job batch"
        );

        // Jobs run detached: dropping this future (a disconnected admin
        // request, say) must not abort handlers or leave claims unreported.
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let handles: Vec<_> = jobs
            .into_iter()
            .map(|job| {
                let attempt = Attempt {
                    store: Arc::clone(&self.store),
                    registry: Arc::clone(&self.registry),
                    owner: Arc::clone(&owner),
                    lease: self.lease,
                };
                let semaphore = Arc::clone(&semaphore);
                tokio::spawn(async move {
                    let Some(_permit) = attempt.wait_for_slot(job.id, semaphore).await else {
                        return Outcome::LostLease;
                    };
                    attempt.execute(job).await
                })
            })
            .collect();

        for handle in handles {
            match handle.await {
                Ok(outcome) => report.record(outcome),
                Err(e) => {
                    error!(worker_id = %owner, error = %e, "Dispatch task failed");
                    report.record(Outcome::LostLease);
                }
            }
        }

        info!(
            worker_id = %owner,
            processed = report.processed_count,
            succeeded = report.succeeded,
            retried = report.retried,
            dead_lettered = report.dead_lettered,
            lost_leases = report.lost_leases,
            "Dispatch cycle finished"
        );
        Ok(report)
    }
}

/// One claimed job on its way to a recorded outcome.
struct Attempt {
    store: Arc<dyn JobStore>,
    registry: Arc<HandlerRegistry>,
    owner: Arc<str>,
    lease: Duration,
}

impl Attempt {
    fn heartbeat(&self) -> Interval {
        let period = (self.lease / 3).max(MIN_HEARTBEAT);
        let mut heartbeat = time::interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        heartbeat
    }

    /// Wait for a concurrency slot, keeping the claim's lease alive meanwhile.
    async fn wait_for_slot(
        &self,
        job_id: Uuid,
        semaphore: Arc<Semaphore>,
    ) -> Option<OwnedSemaphorePermit> {
        let acquire = semaphore.acquire_owned();
        tokio::pin!(acquire);
        let mut heartbeat = self.heartbeat();

        loop {
            tokio::select! {
                permit = &mut acquire => return permit.ok(),
                _ = heartbeat.tick() => {
                    match self.store.extend_lease(job_id, &self.owner, self.lease).await {
                        Ok(true) => {}
                        Ok(false) => {
                            warn!(job_id = %job_id, "Lease lost while waiting for a slot");
                            return None;
                        }
                        Err(e) => warn!(job_id = %job_id, error = %e, "Heartbeat failed"),
                    }
                }
            }
        }
    }

    async fn execute(self, job: Job) -> Outcome {
        let job_id = job.id;

        // Restart the lease clock for the handler's own deadline.
        match self.store.extend_lease(job_id, &self.owner, self.lease).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(job_id = %job_id, "Lease lost before handler started");
                return Outcome::LostLease;
            }
            Err(e) => warn!(job_id = %job_id, error = %e, "Failed to refresh lease"),
        }

        let Some(handler) = self.registry.get(&job.job_type) else {
            let failure = JobFailure::permanent(format!(
                "no handler registered for job type '{}'",
                job.job_type
            ));
            return self.fail(job_id, failure).await;
        };

        info!(
            job_id = %job_id,
            job_type = %job.job_type,
            queue = %job.queue,
            attempt = job.attempts,
            max_attempts = job.max_attempts,
            "Processing job"
        );

        let ctx = JobContext::new(job);
        let mut handle = tokio::spawn(async move { handler.handle(&ctx).await });

        let mut heartbeat = self.heartbeat();
        let deadline = time::sleep(self.lease);
        tokio::pin!(deadline);

        let joined = loop {
            tokio::select! {
                joined = &mut handle => break joined,
                _ = &mut deadline => {
                    handle.abort();
                    warn!(job_id = %job_id, lease = ?self.lease, "Handler exceeded its lease");
                    let failure =
                        JobFailure::transient(format!("handler timed out after {:?}", self.lease));
                    return self.fail(job_id, failure).await;
                }
                _ = heartbeat.tick() => {
                    match self.store.extend_lease(job_id, &self.owner, self.lease).await {
                        Ok(true) => {}
                        Ok(false) => {
                            handle.abort();
                            warn!(job_id = %job_id, "Lease lost while handler was running");
                            return Outcome::LostLease;
                        }
                        Err(e) => warn!(job_id = %job_id, error = %e, "Heartbeat failed"),
                    }
                }
            }
        };

        match joined {
            Ok(Ok(())) => self.succeed(job_id).await,
            Ok(Err(err)) => self.fail(job_id, err.into()).await,
            Err(err) => self.fail(job_id, JobFailure::transient(join_failure(err))).await,
        }
    }

    async fn succeed(&self, job_id: Uuid) -> Outcome {
        match self.store.report_success(job_id, &self.owner).await {
            Ok(true) => {
                info!(job_id = %job_id, "Job completed");
                Outcome::Succeeded
            }
            Ok(false) => {
                warn!(job_id = %job_id, "Job finished after its lease was lost; result discarded");
                Outcome::LostLease
            }
            Err(e) => {
                error!(job_id = %job_id, error = %e, "Failed to record job success");
                Outcome::LostLease
            }
        }
    }

    async fn fail(&self, job_id: Uuid, failure: JobFailure) -> Outcome {
        match self.store.report_failure(job_id, &self.owner, &failure).await {
            Ok(Some(RetryDecision::Requeue { delay })) => {
                warn!(
                    job_id = %job_id,
                    kind = %failure.kind,
                    error = %failure.message,
                    retry_in_ms = delay.as_millis() as u64,
                    "Job failed; requeued"
                );
                Outcome::Retried
            }
            Ok(Some(RetryDecision::DeadLetter)) => {
                error!(
                    job_id = %job_id,
                    kind = %failure.kind,
                    error = %failure.message,
                    "Job dead-lettered"
                );
                Outcome::DeadLettered
            }
            Ok(None) => {
                warn!(job_id = %job_id, error = %failure.message, "Job failed after its lease was lost");
                Outcome::LostLease
            }
            Err(e) => {
                error!(job_id = %job_id, error = %e, "Failed to record job failure");
                Outcome::LostLease
            }
        }
    }
}

fn join_failure(err: JoinError) -> String {
    if !err.is_panic() {
        return "handler task was cancelled".to_string();
    }
    let payload = err.into_panic();
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("handler panicked: {detail}")
}
