//! Single yes/no availability checks against one named dependency.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// A probe failure that is *not* ordinary unavailability: bad configuration, a missing
/// feature, a bug. Unreachable targets, timeouts and refused credentials are reported as
/// `Ok(false)` instead.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("probe misconfigured: {0}")]
    Config(String),
    #[error("probe not supported in this build: {0}")]
    Unsupported(String),
}

#[async_trait]
pub trait Probe: Send + Sync {
    /// Name reported in progress lines and telemetry.
    fn target(&self) -> &str;

    /// `Ok(true)` when the dependency is available, `Ok(false)` when it is not (yet).
    async fn check(&self) -> Result<bool, ProbeError>;
}

/// Outcome of one attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    pub target: String,
    pub success: bool,
    /// 1-based.
    pub attempt: u32,
    pub timestamp: DateTime<Utc>,
}
