//! # jobhub-database
//!
//! The durable side of the job queue: the [`JobStore`] contract, its
//! PostgreSQL implementation ([`JobRepository`]), a process-local
//! implementation ([`MemoryJobStore`]), connection pooling, and migrations.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use memory::MemoryJobStore;
pub use repositories::JobRepository;
pub use store::{JobStore, open_store};
