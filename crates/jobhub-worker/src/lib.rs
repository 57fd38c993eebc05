//! Background job processing for JobHub.
//!
//! This crate provides:
//! - A producer API for enqueuing jobs
//! - A handler registry keyed by job type, plus two built-in handlers
//! - A dispatcher that claims a batch and settles every job in it
//! - Dead-letter inspection and retry
//! - A read-only backlog status reporter
//! - A polling runner and a cron scheduler that drive the dispatcher

pub mod builtin;
pub mod dead_letter;
pub mod dispatcher;
pub mod executor;
pub mod queue;
pub mod runner;
pub mod scheduler;
pub mod status;

pub use builtin::builtin_registry;
pub use dead_letter::DeadLetterManager;
pub use dispatcher::{DispatchReport, Dispatcher};
pub use executor::{HandlerError, HandlerRegistry, JobContext, JobHandler};
pub use queue::{JobCreateParams, JobQueue};
pub use runner::WorkerRunner;
pub use scheduler::CronScheduler;
pub use status::StatusReporter;
