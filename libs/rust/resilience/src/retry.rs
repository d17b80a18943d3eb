//! Bounded, sequential polling of a [`Probe`].
//!
//! ```text
//! Probing(n) --true-------------------> Passed(n)
//! Probing(n) --false, n == max--------> Failed(n)
//! Probing(n) --false, n < max, sleep--> Probing(n + 1)
//! ```
//!
//! A probe error aborts the run immediately without consuming the remaining attempts.

use crate::probe::{Probe, ProbeError, ProbeResult};
use crate::telemetry;
use chrono::Utc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum HealthError {
    #[error("invalid retry policy: {0}")]
    InvalidConfig(String),
    #[error("{target} probe failed fatally on attempt {attempt}: {source}")]
    ProbeFatal {
        target: String,
        attempt: u32,
        #[source]
        source: ProbeError,
    },
    #[error("{target} unavailable after {attempts} attempts")]
    Unavailable { target: String, attempts: u32 },
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
    /// Deadline for a single probe call; an attempt that overruns counts as unavailable.
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self { Self { max_attempts: 30, retry_delay: Duration::from_secs(2), attempt_timeout: None } }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, retry_delay: Duration) -> Result<Self, HealthError> {
        let policy = Self { max_attempts, retry_delay, attempt_timeout: None };
        policy.validate()?;
        Ok(policy)
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    fn validate(&self) -> Result<(), HealthError> {
        if self.max_attempts == 0 {
            return Err(HealthError::InvalidConfig("max_attempts must be at least 1".into()));
        }
        if self.attempt_timeout.is_some_and(|t| t.is_zero()) {
            return Err(HealthError::InvalidConfig("attempt_timeout must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Probing { attempt: u32 },
    Passed { attempts: u32 },
    Failed { attempts: u32 },
}

impl HealthState {
    pub fn is_terminal(&self) -> bool { !matches!(self, HealthState::Probing { .. }) }

    /// Transition after a probe answered `success` on the current attempt. Terminal states
    /// are absorbing.
    pub fn advance(self, success: bool, max_attempts: u32) -> HealthState {
        match self {
            HealthState::Probing { attempt } if success => HealthState::Passed { attempts: attempt },
            HealthState::Probing { attempt } if attempt >= max_attempts => HealthState::Failed { attempts: attempt },
            HealthState::Probing { attempt } => HealthState::Probing { attempt: attempt + 1 },
            terminal => terminal,
        }
    }
}

/// Terminal state of a run together with every attempt made.
#[derive(Debug, Clone)]
pub struct HealthReport {
    pub target: String,
    pub state: HealthState,
    pub attempts: Vec<ProbeResult>,
}

impl HealthReport {
    pub fn passed(&self) -> bool { matches!(self.state, HealthState::Passed { .. }) }
    pub fn attempts_used(&self) -> u32 { self.attempts.len() as u32 }

    /// `Ok(attempts)` on pass, [`HealthError::Unavailable`] on exhaustion.
    pub fn into_result(self) -> Result<u32, HealthError> {
        match self.state {
            HealthState::Passed { attempts } => Ok(attempts),
            HealthState::Failed { attempts } | HealthState::Probing { attempt: attempts } => {
                Err(HealthError::Unavailable { target: self.target, attempts })
            }
        }
    }
}

pub struct HealthOrchestrator {
    policy: RetryPolicy,
}

impl HealthOrchestrator {
    pub fn new(policy: RetryPolicy) -> Result<Self, HealthError> {
        policy.validate()?;
        Ok(Self { policy })
    }

    pub fn policy(&self) -> &RetryPolicy { &self.policy }

    /// Poll `probe` until it passes or the attempt budget runs out. `on_attempt` sees every
    /// attempt as it completes, before the next delay.
    pub async fn run<P, F>(&self, probe: &P, mut on_attempt: F) -> Result<HealthReport, HealthError>
    where
        P: Probe + ?Sized,
        F: FnMut(&ProbeResult),
    {
        let target = probe.target().to_string();
        let max = self.policy.max_attempts;
        let mut state = HealthState::Probing { attempt: 1 };
        let mut attempts = Vec::new();

        while let HealthState::Probing { attempt } = state {
            let success = self.attempt(probe, attempt).await?;
            telemetry::record_attempt(&target, success);
            let result = ProbeResult { target: target.clone(), success, attempt, timestamp: Utc::now() };
            debug!(target_name = %target, attempt, max, success, "probe attempt");
            on_attempt(&result);
            attempts.push(result);

            state = state.advance(success, max);
            if matches!(state, HealthState::Probing { .. }) && !self.policy.retry_delay.is_zero() {
                tokio::time::sleep(self.policy.retry_delay).await;
            }
        }

        match state {
            HealthState::Passed { attempts: n } => info!(target_name = %target, attempts = n, "health check passed"),
            _ => {
                telemetry::record_exhausted(&target);
                warn!(target_name = %target, attempts = max, "health check failed");
            }
        }
        Ok(HealthReport { target, state, attempts })
    }

    async fn attempt<P: Probe + ?Sized>(&self, probe: &P, attempt: u32) -> Result<bool, HealthError> {
        let outcome = match self.policy.attempt_timeout {
            Some(limit) => match tokio::time::timeout(limit, probe.check()).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    debug!(target_name = %probe.target(), attempt, ?limit, "probe attempt timed out");
                    Ok(false)
                }
            },
            None => probe.check().await,
        };
        outcome.map_err(|source| HealthError::ProbeFatal { target: probe.target().to_string(), attempt, source })
    }
}
