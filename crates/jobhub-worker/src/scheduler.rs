//! Cron scheduler that triggers dispatch cycles.

use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};

use jobhub_core::config::{ScheduleConfig, WorkerConfig};
use jobhub_core::error::AppError;

use crate::dispatcher::Dispatcher;

/// Cron-based scheduler that runs the dispatcher on fixed schedules
pub struct CronScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
    /// Dispatcher invoked by every schedule
    dispatcher: Arc<Dispatcher>,
    /// Number of registered schedules
    registered: usize,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler")
            .field("registered", &self.registered)
            .finish()
    }
}

impl CronScheduler {
    /// Create a new cron scheduler
    pub async fn new(dispatcher: Arc<Dispatcher>) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self {
            scheduler,
            dispatcher,
            registered: 0,
        })
    }

    /// Register every schedule from `worker.schedules`
    pub async fn register_configured(&mut self, config: &WorkerConfig) -> Result<(), AppError> {
        for schedule in &config.schedules {
            self.register(schedule, config.batch_size).await?;
        }

        tracing::info!(count = self.registered, "Scheduled dispatch cycles registered");
        Ok(())
    }

    /// Register one schedule. `default_batch_size` applies when the schedule
    /// sets none.
    pub async fn register(
        &mut self,
        schedule: &ScheduleConfig,
        default_batch_size: usize,
    ) -> Result<(), AppError> {
        let dispatcher = Arc::clone(&self.dispatcher);
        let batch_size = schedule.batch_size.unwrap_or(default_batch_size);
        let queue = schedule.queue.clone();

        let job = CronJob::new_async(schedule.cron.as_str(), move |_uuid, _lock| {
            let dispatcher = Arc::clone(&dispatcher);
            let queue = queue.clone();
            Box::pin(async move {
                tracing::debug!(queue = queue.as_deref().unwrap_or("*"), "Scheduled dispatch cycle");
                if let Err(e) = dispatcher.run(batch_size, queue.as_deref()).await {
                    tracing::error!(error = %e, "Scheduled dispatch cycle failed");
                }
            })
        })
        .map_err(|e| {
            AppError::configuration(format!("Invalid cron expression '{}': {e}", schedule.cron))
        })?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add schedule: {e}")))?;

        self.registered += 1;
        tracing::info!(
            cron = %schedule.cron,
            queue = schedule.queue.as_deref().unwrap_or("*"),
            batch_size,
            "Registered dispatch schedule"
        );
        Ok(())
    }

    /// Number of registered schedules
    pub fn registered(&self) -> usize {
        self.registered
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        tracing::info!("Cron scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&mut self) -> Result<(), AppError> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        tracing::info!("Cron scheduler shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use jobhub_core::retry::NoRetry;
    use jobhub_database::MemoryJobStore;

    use crate::executor::HandlerRegistry;

    async fn scheduler() -> CronScheduler {
        let store = Arc::new(MemoryJobStore::new(Arc::new(NoRetry)));
        let dispatcher = Dispatcher::new(
            store,
            Arc::new(HandlerRegistry::new()),
            &WorkerConfig::default(),
        );
        CronScheduler::new(Arc::new(dispatcher)).await.unwrap()
    }

    #[tokio::test]
    async fn test_register_configured_schedules() {
        let mut scheduler = scheduler().await;
        let config = WorkerConfig {
            schedules: vec![
                ScheduleConfig {
                    cron: "0 */5 * * * *".to_string(),
                    queue: Some("reports".to_string()),
                    batch_size: Some(50),
                },
                ScheduleConfig {
                    cron: "*/30 * * * * *".to_string(),
                    queue: None,
                    batch_size: None,
                },
            ],
            ..WorkerConfig::default()
        };

        scheduler.register_configured(&config).await.unwrap();
        assert_eq!(scheduler.registered(), 2);
    }

    #[tokio::test]
    async fn test_invalid_cron_is_a_configuration_error() {
        let mut scheduler = scheduler().await;
        let schedule = ScheduleConfig {
            cron: "every five minutes".to_string(),
            queue: None,
            batch_size: None,
        };

        let err = scheduler.register(&schedule, 10).await.unwrap_err();
        assert_eq!(err.kind, jobhub_core::error::ErrorKind::Configuration);
    }
}
