//! HTTP-level integration tests against an in-memory job store.

mod helpers;

mod health_test;
mod jobs_test;
mod queue_admin_test;
