//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use jobhub_core::config::AppConfig;
use jobhub_database::JobStore;
use jobhub_worker::{DeadLetterManager, Dispatcher, JobQueue, StatusReporter};

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Job store shared with the worker
    pub store: Arc<dyn JobStore>,
    /// Producer API
    pub queue: Arc<JobQueue>,
    /// Dispatcher shared with the runner and scheduler
    pub dispatcher: Arc<Dispatcher>,
    /// Dead-letter inspection and retry
    pub dead_letters: Arc<DeadLetterManager>,
    /// Backlog health snapshots
    pub reporter: Arc<StatusReporter>,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// Build the state around an existing store and dispatcher.
    pub fn new(config: Arc<AppConfig>, store: Arc<dyn JobStore>, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            queue: Arc::new(JobQueue::new(Arc::clone(&store), &config.worker)),
            dead_letters: Arc::new(DeadLetterManager::new(Arc::clone(&store))),
            reporter: Arc::new(StatusReporter::new(Arc::clone(&store))),
            config,
            store,
            dispatcher,
            started_at: Instant::now(),
        }
    }
}
