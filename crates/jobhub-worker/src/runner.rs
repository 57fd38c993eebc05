//! Polling loop that drives the dispatcher on an interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;

use jobhub_core::config::WorkerConfig;

use crate::dispatcher::Dispatcher;

/// Main worker runner that polls queues through the dispatcher
#[derive(Debug)]
pub struct WorkerRunner {
    /// Dispatcher that claims and settles each batch
    dispatcher: Arc<Dispatcher>,
    /// Jobs claimed per cycle
    batch_size: usize,
    /// Pause after an idle cycle
    poll_interval: Duration,
    /// Queues to poll, in order; `None` polls every queue at once
    queues: Vec<Option<String>>,
}

impl WorkerRunner {
    /// Create a new worker runner
    pub fn new(dispatcher: Arc<Dispatcher>, config: &WorkerConfig) -> Self {
        let queues = if config.queues.is_empty() {
            vec![None]
        } else {
            config.queues.iter().cloned().map(Some).collect()
        };

        Self {
            dispatcher,
            batch_size: config.batch_size,
            poll_interval: Duration::from_secs(config.poll_interval_seconds),
            queues,
        }
    }

    /// Override the idle pause
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Poll until the cancel signal is received.
    ///
    /// A batch in progress is always allowed to settle; the signal is only
    /// checked between cycles.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        tracing::info!(
            worker_id = %self.dispatcher.worker_id(),
            batch_size = self.batch_size,
            poll_interval = ?self.poll_interval,
            queues = ?self.queues,
            "Worker started"
        );

        loop {
            if *cancel.borrow() {
                break;
            }

            let busy = self.poll_once().await;
            if busy {
                continue;
            }

            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        break;
                    }
                }
                _ = time::sleep(self.poll_interval) => {}
            }
        }

        tracing::info!(worker_id = %self.dispatcher.worker_id(), "Worker shut down complete");
    }

    /// Run one cycle over every configured queue. Returns whether any job
    /// was processed.
    async fn poll_once(&self) -> bool {
        let mut busy = false;
        for queue in &self.queues {
            match self.dispatcher.run(self.batch_size, queue.as_deref()).await {
                Ok(report) => busy |= !report.is_idle(),
                Err(e) => {
                    tracing::error!(
                        queue = queue.as_deref().unwrap_or("*"),
                        error = %e,
                        "Failed to claim jobs"
                    );
                }
            }
        }
        busy
    }
}
