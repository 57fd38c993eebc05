//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod app;
pub mod database;
pub mod logging;
pub mod retry;
pub mod worker;

use serde::{Deserialize, Serialize};

pub use self::app::ServerConfig;
pub use self::database::{DatabaseConfig, StoreBackend};
pub use self::logging::LoggingConfig;
pub use self::retry::{RetryConfig, RetryPolicyKind};
pub use self::worker::{ScheduleConfig, WorkerConfig};

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (base file + environment overlay + env vars).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Job store connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Dispatcher and scheduling settings.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the base configuration file at `path` with an
    /// environment-specific overlay (`config/{env}.toml`) and environment
    /// variables prefixed with `JOBHUB__`.
    pub fn load(path: &str, env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("JOBHUB")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let loaded: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        loaded.validate()?;
        Ok(loaded)
    }

    /// Reject settings the dispatcher cannot operate with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.worker.concurrency == 0 {
            return Err(AppError::configuration("worker.concurrency must be at least 1"));
        }
        if self.worker.batch_size == 0 {
            return Err(AppError::configuration("worker.batch_size must be at least 1"));
        }
        if self.worker.lease_seconds == 0 {
            return Err(AppError::configuration("worker.lease_seconds must be at least 1"));
        }
        if self.worker.retry.default_max_attempts < 1 {
            return Err(AppError::configuration(
                "worker.retry.default_max_attempts must be at least 1",
            ));
        }
        if self.worker.retry.factor < 1.0 {
            return Err(AppError::configuration("worker.retry.factor must be >= 1.0"));
        }
        if self.database.backend == StoreBackend::Postgres && self.database.url.is_empty() {
            return Err(AppError::configuration(
                "database.url is required for the postgres backend",
            ));
        }
        Ok(())
    }
}
