//! CLI command definitions and dispatch.

pub mod config;
pub mod migrate;
pub mod queue;
pub mod serve;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use jobhub_core::config::AppConfig;
use jobhub_core::error::AppError;
use jobhub_core::retry::policy_from_config;
use jobhub_database::{JobStore, open_store};

/// JobHub: durable background jobs with retries and dead-lettering
#[derive(Debug, Parser)]
#[command(name = "jobhub", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Environment overlay loaded from `config/{env}.toml`
    #[arg(short, long, default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the JobHub server with its background worker
    Serve(serve::ServeArgs),
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Queue inspection and dead-letter management
    Queue(queue::QueueArgs),
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Serve(args) => serve::execute(args, &self.config, &self.env).await,
            Commands::Migrate(args) => {
                migrate::execute(args, &self.config, &self.env, self.format).await
            }
            Commands::Queue(args) => queue::execute(args, &self.config, &self.env, self.format).await,
            Commands::Config(args) => {
                config::execute(args, &self.config, &self.env, self.format).await
            }
        }
    }
}

/// Helper: load configuration from file, overlay and environment
pub fn load_config(config_path: &str, env: &str) -> Result<AppConfig, AppError> {
    AppConfig::load(config_path, env)
}

/// Helper: open the configured job store
pub async fn open_job_store(config: &AppConfig) -> Result<Arc<dyn JobStore>, AppError> {
    let policy = policy_from_config(&config.worker.retry);
    open_store(&config.database, policy).await
}
