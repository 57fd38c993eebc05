//! Background job domain entities.

pub mod model;
pub mod report;
pub mod status;

pub use model::{Job, NewJob};
pub use report::{FailureSummary, QueueStatus, StatusCounts};
pub use status::JobStatus;
