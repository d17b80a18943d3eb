//! Health probing with a bounded retry budget.
//!
//! A [`Probe`] answers one availability question; [`HealthOrchestrator`] polls it with a fixed
//! delay until it passes or the attempt budget is spent.

pub mod probe;
pub mod retry;
mod telemetry;

pub use probe::{Probe, ProbeError, ProbeResult};
pub use retry::{HealthError, HealthOrchestrator, HealthReport, HealthState, RetryPolicy};
