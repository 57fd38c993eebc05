//! Background worker configuration.

use serde::{Deserialize, Serialize};

use super::retry::RetryConfig;

/// Dispatcher, polling runner and scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the polling runner is started with the server.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Lease owner identifier. Generated per process when empty.
    #[serde(default)]
    pub worker_id: String,
    /// Maximum number of handlers executing at once within a batch.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Jobs claimed per dispatch cycle.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Interval in seconds between polls when the previous cycle was idle.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Lease length in seconds. A handler running longer is cancelled.
    #[serde(default = "default_lease_seconds")]
    pub lease_seconds: u64,
    /// Queues polled by the runner, in order. Empty means all queues.
    #[serde(default)]
    pub queues: Vec<String>,
    /// Default queue for jobs enqueued without one.
    #[serde(default = "default_queue")]
    pub default_queue: String,
    /// Retry policy settings.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Cron-triggered dispatch cycles.
    #[serde(default)]
    pub schedules: Vec<ScheduleConfig>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            worker_id: String::new(),
            concurrency: default_concurrency(),
            batch_size: default_batch_size(),
            poll_interval_seconds: default_poll_interval(),
            lease_seconds: default_lease_seconds(),
            queues: Vec::new(),
            default_queue: default_queue(),
            retry: RetryConfig::default(),
            schedules: Vec::new(),
        }
    }
}

/// A cron expression that triggers one dispatch cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Six-field cron expression (seconds first), e.g. `"0 */5 * * * *"`.
    pub cron: String,
    /// Restrict the cycle to one queue.
    #[serde(default)]
    pub queue: Option<String>,
    /// Override `worker.batch_size` for this schedule.
    #[serde(default)]
    pub batch_size: Option<usize>,
}

fn default_true() -> bool {
    true
}

fn default_concurrency() -> usize {
    4
}

fn default_batch_size() -> usize {
    10
}

fn default_poll_interval() -> u64 {
    5
}

fn default_lease_seconds() -> u64 {
    300
}

fn default_queue() -> String {
    "default".to_string()
}
