//! Process-level plumbing: error types and telemetry setup.

pub mod error;
pub mod telemetry;
