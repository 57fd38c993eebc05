//! Handlers shipped with the server binary.
//!
//! Real handlers live in the applications that embed the worker; these two
//! exist so a fresh deployment can be smoke-tested end to end.

use std::sync::Arc;

use async_trait::async_trait;

use crate::executor::{HandlerError, HandlerRegistry, JobContext, JobHandler};

/// Completes immediately.
#[derive(Debug, Default)]
pub struct NoopHandler;

#[async_trait]
impl JobHandler for NoopHandler {
    fn job_type(&self) -> &str {
        "noop"
    }

    async fn handle(&self, _ctx: &JobContext) -> Result<(), HandlerError> {
        Ok(())
    }
}

/// Logs the payload at info level and completes.
#[derive(Debug, Default)]
pub struct LogHandler;

#[async_trait]
impl JobHandler for LogHandler {
    fn job_type(&self) -> &str {
        "log"
    }

    async fn handle(&self, ctx: &JobContext) -> Result<(), HandlerError> {
        tracing::info!(
            job_id = %ctx.job_id(),
            queue = %ctx.queue(),
            attempt = ctx.attempt(),
            payload = %ctx.payload(),
            "Log job"
        );
        Ok(())
    }
}

/// Registry holding the built-in handlers.
pub fn builtin_registry() -> HandlerRegistry {
    HandlerRegistry::new()
        .with(Arc::new(NoopHandler))
        .with(Arc::new(LogHandler))
}
