//! Queue inspection and dead-letter management commands.

use std::sync::Arc;

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;
use uuid::Uuid;

use crate::output::{self, OutputFormat};
use jobhub_core::config::StoreBackend;
use jobhub_core::error::AppError;
use jobhub_entity::job::{FailureSummary, Job};
use jobhub_worker::{DeadLetterManager, JobCreateParams, JobQueue, StatusReporter};

/// Arguments for queue commands
#[derive(Debug, Args)]
pub struct QueueArgs {
    /// Queue subcommand
    #[command(subcommand)]
    pub command: QueueCommand,
}

/// Queue subcommands
#[derive(Debug, Subcommand)]
pub enum QueueCommand {
    /// Show backlog health
    Status {
        /// Number of recent failures to include
        #[arg(short, long, default_value_t = 10)]
        limit: i64,
    },
    /// Enqueue a job
    Enqueue {
        /// Job type, used to select the handler
        job_type: String,
        /// Target queue (defaults to `worker.default_queue`)
        #[arg(short, long)]
        queue: Option<String>,
        /// JSON payload
        #[arg(short, long, default_value = "{}")]
        payload: String,
        /// Attempt budget (defaults to `worker.retry.default_max_attempts`)
        #[arg(short, long)]
        max_attempts: Option<i32>,
    },
    /// List dead jobs
    Dead {
        /// Maximum number of jobs to list
        #[arg(short, long, default_value_t = 50)]
        limit: i64,
    },
    /// Move dead jobs back to pending
    RetryDead {
        /// Jobs to retry; all dead jobs when omitted
        #[arg(long = "id")]
        ids: Vec<Uuid>,
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Show a single job
    Show {
        /// Job ID
        id: Uuid,
    },
}

#[derive(Debug, Serialize, Tabled)]
struct JobRow {
    /// Job ID
    id: String,
    /// Queue
    queue: String,
    /// Job type
    job_type: String,
    /// Status
    status: String,
    /// Attempts used out of the budget
    attempts: String,
    /// Last error
    last_error: String,
}

impl From<&Job> for JobRow {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id.to_string(),
            queue: job.queue.clone(),
            job_type: job.job_type.clone(),
            status: job.status.to_string(),
            attempts: format!("{}/{}", job.attempts, job.max_attempts),
            last_error: job.last_error.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
struct FailureRow {
    /// Job ID
    id: String,
    /// Queue
    queue: String,
    /// Job type
    job_type: String,
    /// Status
    status: String,
    /// Attempts
    attempts: i32,
    /// Failed at
    failed_at: String,
    /// Last error
    last_error: String,
}

impl From<&FailureSummary> for FailureRow {
    fn from(f: &FailureSummary) -> Self {
        Self {
            id: f.id.to_string(),
            queue: f.queue.clone(),
            job_type: f.job_type.clone(),
            status: f.status.to_string(),
            attempts: f.attempts,
            failed_at: f.failed_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
            last_error: f.last_error.clone().unwrap_or_default(),
        }
    }
}

/// Execute queue commands
pub async fn execute(
    args: &QueueArgs,
    config_path: &str,
    env: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path, env)?;
    if config.database.backend == StoreBackend::Memory {
        output::print_warning("The memory backend is per-process; this command sees an empty queue.");
    }
    let store = super::open_job_store(&config).await?;

    match &args.command {
        QueueCommand::Status { limit } => {
            let status = StatusReporter::new(store).snapshot(*limit).await?;
            if format == OutputFormat::Json {
                output::print_item(&status, format);
                return Ok(());
            }

            println!("Queue Status:");
            for (label, count) in [
                ("Pending", status.status_counts.pending),
                ("Processing", status.status_counts.processing),
                ("Completed", status.status_counts.completed),
                ("Failed", status.status_counts.failed),
                ("Dead", status.status_counts.dead),
            ] {
                output::print_kv(label, &count.to_string());
            }
            let oldest = status
                .oldest_pending_age_ms
                .map(|ms| format!("{:.1}s", ms as f64 / 1000.0))
                .unwrap_or_else(|| "-".to_string());
            output::print_kv("Oldest pending", &oldest);

            println!("\nPending by queue:");
            if status.pending_by_queue.is_empty() {
                println!("  (none)");
            }
            for (queue, count) in &status.pending_by_queue {
                output::print_kv(queue, &count.to_string());
            }

            println!("\nRecent failures:");
            let rows: Vec<FailureRow> = status.recent_failures.iter().map(FailureRow::from).collect();
            output::print_list(&rows, format);
        }
        QueueCommand::Enqueue {
            job_type,
            queue,
            payload,
            max_attempts,
        } => {
            let payload: serde_json::Value = serde_json::from_str(payload)
                .map_err(|e| AppError::validation(format!("Invalid JSON payload: {e}")))?;

            let params = JobCreateParams {
                queue: queue.clone(),
                max_attempts: *max_attempts,
                ..JobCreateParams::new(job_type.clone(), payload)
            };
            let job = JobQueue::new(store, &config.worker).submit(params).await?;

            output::print_success(&format!(
                "Job '{}' enqueued on '{}' (id: {})",
                job.job_type, job.queue, job.id
            ));
        }
        QueueCommand::Dead { limit } => {
            let jobs = DeadLetterManager::new(store).list(*limit).await?;
            let rows: Vec<JobRow> = jobs.iter().map(JobRow::from).collect();
            output::print_list(&rows, format);
        }
        QueueCommand::RetryDead { ids, yes } => {
            let manager = DeadLetterManager::new(Arc::clone(&store));
            let target = if ids.is_empty() { None } else { Some(ids.as_slice()) };

            if target.is_none() && !yes {
                let dead = store.status_counts().await?.dead;
                let confirm = dialoguer::Confirm::new()
                    .with_prompt(format!("Retry all {dead} dead job(s)?"))
                    .default(false)
                    .interact()
                    .map_err(|e| AppError::internal(format!("Input error: {e}")))?;

                if !confirm {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            let requested_by = std::env::var("USER").ok();
            let retried = manager.retry(target, requested_by.as_deref()).await?;
            output::print_success(&format!("{retried} job(s) moved back to pending"));
        }
        QueueCommand::Show { id } => {
            let job = store
                .find_by_id(*id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Job {id} not found")))?;
            match format {
                OutputFormat::Json => output::print_item(&job, format),
                OutputFormat::Table => {
                    output::print_kv("ID", &job.id.to_string());
                    output::print_kv("Queue", &job.queue);
                    output::print_kv("Type", &job.job_type);
                    output::print_kv("Status", &job.status.to_string());
                    output::print_kv(
                        "Attempts",
                        &format!("{}/{}", job.attempts, job.max_attempts),
                    );
                    output::print_kv("Available at", &job.available_at.to_rfc3339());
                    output::print_kv("Lease owner", job.lease_owner.as_deref().unwrap_or("-"));
                    output::print_kv("Last error", job.last_error.as_deref().unwrap_or("-"));
                    output::print_kv("Payload", &job.payload.to_string());
                }
            }
        }
    }

    Ok(())
}
