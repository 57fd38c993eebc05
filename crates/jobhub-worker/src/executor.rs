//! Job handlers and the registry that maps job types to them.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use jobhub_core::traits::JobFailure;
use jobhub_entity::job::Job;

/// Trait for job handler implementations
#[async_trait]
pub trait JobHandler: Send + Sync + std::fmt::Debug {
    /// Get the job type this handler processes
    fn job_type(&self) -> &str;

    /// Execute one attempt of the job
    async fn handle(&self, ctx: &JobContext) -> Result<(), HandlerError>;
}

/// Error returned by a handler attempt
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandlerError {
    /// May succeed on retry
    #[error("{0}")]
    Transient(String),

    /// Retrying cannot help
    #[error("{0}")]
    Permanent(String),
}

impl HandlerError {
    /// Shorthand for [`HandlerError::Transient`].
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient(message.into())
    }

    /// Shorthand for [`HandlerError::Permanent`].
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent(message.into())
    }
}

impl From<HandlerError> for JobFailure {
    fn from(err: HandlerError) -> Self {
        match err {
            HandlerError::Transient(msg) => JobFailure::transient(msg),
            HandlerError::Permanent(msg) => JobFailure::permanent(msg),
        }
    }
}

/// What a handler sees of the job it is running.
#[derive(Debug, Clone)]
pub struct JobContext {
    job: Job,
}

impl JobContext {
    pub(crate) fn new(job: Job) -> Self {
        Self { job }
    }

    /// Job identifier.
    pub fn job_id(&self) -> Uuid {
        self.job.id
    }

    /// Handler key.
    pub fn job_type(&self) -> &str {
        &self.job.job_type
    }

    /// Queue the job was claimed from.
    pub fn queue(&self) -> &str {
        &self.job.queue
    }

    /// 1-based number of this attempt.
    pub fn attempt(&self) -> i32 {
        self.job.attempts
    }

    /// Attempt ceiling.
    pub fn max_attempts(&self) -> i32 {
        self.job.max_attempts
    }

    /// Raw payload.
    pub fn payload(&self) -> &serde_json::Value {
        &self.job.payload
    }

    /// Deserialize the payload. A payload that does not match `T` can never
    /// succeed, so it fails permanently.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        serde_json::from_value(self.job.payload.clone())
            .map_err(|e| HandlerError::permanent(format!("malformed payload: {e}")))
    }
}

/// Dispatches jobs to the appropriate handler based on job_type
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl HandlerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job handler, replacing any previous handler for its type
    pub fn register(&mut self, handler: Arc<dyn JobHandler>) {
        let job_type = handler.job_type().to_string();
        tracing::info!(job_type = %job_type, "Registered job handler");
        self.handlers.insert(job_type, handler);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, handler: Arc<dyn JobHandler>) -> Self {
        self.register(handler);
        self
    }

    /// Look up the handler for a job type
    pub fn get(&self, job_type: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(job_type).cloned()
    }

    /// Check if a handler is registered for a job type
    pub fn has_handler(&self, job_type: &str) -> bool {
        self.handlers.contains_key(job_type)
    }

    /// Get the list of registered job types, sorted
    pub fn registered_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.keys().cloned().collect();
        types.sort();
        types
    }
}
