//! Read-only backlog health reporting.

use std::sync::Arc;

use jobhub_core::result::AppResult;
use jobhub_database::JobStore;
use jobhub_entity::job::{FailureSummary, QueueStatus};

/// Builds [`QueueStatus`] snapshots. Takes no locks; the parts of a
/// snapshot are read independently and may be mutually a little stale.
#[derive(Debug, Clone)]
pub struct StatusReporter {
    store: Arc<dyn JobStore>,
}

impl StatusReporter {
    /// Create a reporter over `store`.
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// Current counts, backlog per queue, newest failures and backlog age.
    pub async fn snapshot(&self, recent_failure_limit: i64) -> AppResult<QueueStatus> {
        let (status_counts, pending_by_queue, failures, oldest) = tokio::try_join!(
            self.store.status_counts(),
            self.store.pending_by_queue(),
            self.store.recent_failures(recent_failure_limit),
            self.store.oldest_pending_age(),
        )?;

        Ok(QueueStatus {
            status_counts,
            pending_by_queue,
            recent_failures: failures.iter().map(FailureSummary::from).collect(),
            oldest_pending_age_ms: oldest.map(|age| age.as_millis() as i64),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use jobhub_core::retry::FixedDelay;
    use jobhub_core::traits::JobFailure;
    use jobhub_database::MemoryJobStore;
    use jobhub_entity::job::{JobStatus, NewJob};

    fn new_job(queue: &str) -> NewJob {
        NewJob::new("email.send", queue, serde_json::json!({}), 3)
    }

    #[tokio::test]
    async fn test_empty_snapshot() {
        let store = Arc::new(MemoryJobStore::new(Arc::new(FixedDelay::immediate())));
        let status = StatusReporter::new(store).snapshot(10).await.unwrap();

        assert_eq!(status.status_counts.total(), 0);
        assert!(status.pending_by_queue.is_empty());
        assert!(status.recent_failures.is_empty());
        assert_eq!(status.oldest_pending_age_ms, None);
    }

    #[tokio::test]
    async fn test_snapshot_reflects_backlog_and_failures() {
        let store = Arc::new(MemoryJobStore::new(Arc::new(FixedDelay::immediate())));
        let reporter = StatusReporter::new(store.clone());

        let failing = store.enqueue(new_job("email")).await.unwrap();
        store.enqueue(new_job("email")).await.unwrap();
        store.enqueue(new_job("sms")).await.unwrap();

        store
            .claim_batch(None, 1, "w1", Duration::from_secs(60))
            .await
            .unwrap();
        store
            .report_failure(failing.id, "w1", &JobFailure::transient("smtp 421"))
            .await
            .unwrap();

        let status = reporter.snapshot(10).await.unwrap();
        assert_eq!(status.status_counts.pending, 3);
        assert_eq!(status.pending_by_queue.get("email"), Some(&2));
        assert_eq!(status.pending_by_queue.get("sms"), Some(&1));
        assert_eq!(status.recent_failures.len(), 1);
        assert_eq!(status.recent_failures[0].id, failing.id);
        assert_eq!(status.recent_failures[0].status, JobStatus::Pending);
        assert_eq!(status.recent_failures[0].last_error.as_deref(), Some("smtp 421"));
        assert!(status.oldest_pending_age_ms.is_some());
    }

    #[tokio::test]
    async fn test_oldest_pending_age_grows_until_drained() {
        let store = Arc::new(MemoryJobStore::new(Arc::new(FixedDelay::immediate())));
        let reporter = StatusReporter::new(store.clone());
        store.enqueue(new_job("email")).await.unwrap();

        let first = reporter.snapshot(0).await.unwrap().oldest_pending_age_ms.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = reporter.snapshot(0).await.unwrap().oldest_pending_age_ms.unwrap();
        assert!(second >= first);

        store
            .claim_batch(None, 10, "w1", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(reporter.snapshot(0).await.unwrap().oldest_pending_age_ms, None);
    }
}
