//! Admin handlers.

pub mod queue;
