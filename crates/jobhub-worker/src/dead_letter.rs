//! Dead-letter inspection and operator-triggered retry.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use jobhub_core::result::AppResult;
use jobhub_database::JobStore;
use jobhub_entity::job::{Job, JobStatus};

/// Returns dead jobs to circulation with a fresh retry budget.
#[derive(Debug, Clone)]
pub struct DeadLetterManager {
    store: Arc<dyn JobStore>,
}

impl DeadLetterManager {
    /// Create a manager over `store`.
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// Requeue dead jobs. `None` retries every dead job; an empty slice
    /// retries nothing. Ids that are unknown or not dead are ignored.
    pub async fn retry(&self, job_ids: Option<&[Uuid]>, requested_by: Option<&str>) -> AppResult<u64> {
        let retried = match job_ids {
            Some([]) => 0,
            ids => self.store.requeue_dead(ids).await?,
        };

        info!(
            requested_by = requested_by.unwrap_or("unknown"),
            requested = job_ids.map(<[Uuid]>::len),
            retried,
            "Retried dead-lettered jobs"
        );
        Ok(retried)
    }

    /// Dead jobs, most recently changed first.
    pub async fn list(&self, limit: i64) -> AppResult<Vec<Job>> {
        self.store.list_by_status(JobStatus::Dead, limit).await
    }
}
