//! Container health checks: pick a dependency by name and poll it until it is up or the
//! retry budget runs out.

use anyhow::{Context, Result};
use clap::{error::ErrorKind, Parser};
use mlops_core::HealthSettings;
use mlops_resilience::{HealthError, HealthOrchestrator, Probe, ProbeError, ProbeResult, RetryPolicy};
use std::ffi::OsString;
use std::io::Write;
use std::str::FromStr;
use tracing::{error, info, warn};

pub mod probes;

pub use probes::{ArtifactProbe, HttpProbe, PostgresProbe, RedisProbe};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceType {
    Api,
    Database,
    Redis,
    Models,
}

impl ServiceType {
    pub const ALL: [ServiceType; 4] = [ServiceType::Api, ServiceType::Database, ServiceType::Redis, ServiceType::Models];

    pub fn name(&self) -> &'static str {
        match self {
            ServiceType::Api => "api",
            ServiceType::Database => "database",
            ServiceType::Redis => "redis",
            ServiceType::Models => "models",
        }
    }
}

impl FromStr for ServiceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServiceType::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| format!("Unknown service type: {s}"))
    }
}

/// Comma-separated list of accepted service type names.
pub fn service_types() -> String {
    ServiceType::ALL.iter().map(ServiceType::name).collect::<Vec<_>>().join(", ")
}

pub fn build_probe(service: ServiceType, settings: &HealthSettings) -> Result<Box<dyn Probe>, ProbeError> {
    let timeout = settings.attempt_timeout();
    let name = service.name();
    let probe: Box<dyn Probe> = match service {
        ServiceType::Api => Box::new(HttpProbe::new(name, &settings.api_url, timeout)?),
        ServiceType::Database => Box::new(PostgresProbe::new(name, &settings.database_url, timeout)),
        ServiceType::Redis => Box::new(RedisProbe::new(name, &settings.redis_url, timeout)),
        ServiceType::Models => Box::new(ArtifactProbe::new(name, &settings.artifact_dir, settings.required_artifacts.clone())),
    };
    Ok(probe)
}

pub fn retry_policy(settings: &HealthSettings) -> Result<RetryPolicy> {
    let mut policy = RetryPolicy::new(settings.max_attempts, settings.retry_delay())?;
    if settings.attempt_timeout_ms > 0 {
        policy = policy.with_attempt_timeout(settings.attempt_timeout());
    }
    Ok(policy)
}

/// Progress line written for each attempt.
pub fn progress_line(result: &ProbeResult, max_attempts: u32) -> String {
    let verdict = if result.success { "passed" } else { "failed" };
    format!("{} health check {verdict} (attempt {}/{max_attempts})", result.target, result.attempt)
}

/// Poll `probe` under `policy`, writing one progress line per attempt to `out`.
/// Returns whether the check passed. A fatal probe error still gets its attempt line, then is
/// returned as an error.
pub async fn run_health_check<P, W>(probe: &P, policy: RetryPolicy, out: &mut W) -> Result<bool>
where
    P: Probe + ?Sized,
    W: Write,
{
    let max = policy.max_attempts;
    let orchestrator = HealthOrchestrator::new(policy)?;
    let outcome = orchestrator.run(probe, |result| write_line(out, &progress_line(result, max))).await;
    match outcome {
        Ok(report) => Ok(report.passed()),
        Err(err) => {
            if let HealthError::ProbeFatal { target, attempt, .. } = &err {
                write_line(out, &format!("{target} health check error (attempt {attempt}/{max})"));
            }
            Err(err.into())
        }
    }
}

/// Command line of the `health-check` binary.
#[derive(Parser, Debug)]
#[command(name = "health-check", version, about = "Poll one service dependency until it is healthy")]
pub struct Cli {
    /// One of: api, database, redis, models
    pub service_type: String,
}

pub const EXIT_PASSED: u8 = 0;
pub const EXIT_FAILED: u8 = 1;

/// Parse `args` (program name first), run the selected check and return the process exit
/// code. Everything meant for the operator is written to `out`.
pub async fn run_cli<I, T, W>(args: I, settings: &HealthSettings, out: &mut W) -> u8
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    W: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            write_line(out, e.render().to_string().trim_end());
            return EXIT_PASSED;
        }
        Err(_) => {
            write_line(out, "Usage: health-check <service_type>");
            write_line(out, &format!("Service types: {}", service_types()));
            return EXIT_FAILED;
        }
    };

    let name = cli.service_type;
    match check_service(&name, settings, out).await {
        Ok(true) => EXIT_PASSED,
        Ok(false) => {
            write_line(out, &format!("Health check failed for {name}"));
            EXIT_FAILED
        }
        Err(e) => {
            error!(service = %name, error = %format!("{e:#}"), "health check aborted");
            write_line(out, &format!("Health check failed for {name}: {e:#}"));
            EXIT_FAILED
        }
    }
}

async fn check_service<W: Write>(name: &str, settings: &HealthSettings, out: &mut W) -> Result<bool> {
    let service: ServiceType = match name.parse() {
        Ok(service) => service,
        Err(msg) => {
            write_line(out, &msg);
            return Ok(false);
        }
    };
    let probe = build_probe(service, settings).with_context(|| format!("cannot build {} probe", service.name()))?;
    let policy = retry_policy(settings)?;
    info!(service = service.name(), max_attempts = policy.max_attempts, delay_ms = settings.retry_delay_ms, "starting health check");
    run_health_check(probe.as_ref(), policy, out).await
}

fn write_line<W: Write>(out: &mut W, line: &str) {
    if let Err(e) = writeln!(out, "{line}").and_then(|_| out.flush()) {
        warn!(error = %e, "failed to write progress line");
    }
}
