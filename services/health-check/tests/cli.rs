//! Exit codes and operator output of the `health-check` command line.

use health_check::{run_cli, EXIT_FAILED, EXIT_PASSED};
use mlops_core::HealthSettings;
use std::path::Path;

fn settings_for(dir: &Path, required: &[&str]) -> HealthSettings {
    HealthSettings {
        artifact_dir: dir.to_path_buf(),
        required_artifacts: required.iter().map(|s| s.to_string()).collect(),
        max_attempts: 2,
        retry_delay_ms: 0,
        attempt_timeout_ms: 1_000,
        ..Default::default()
    }
}

async fn run(args: &[&str], settings: &HealthSettings) -> (u8, String) {
    let mut out = Vec::new();
    let code = run_cli(std::iter::once("health-check").chain(args.iter().copied()), settings, &mut out).await;
    (code, String::from_utf8(out).unwrap())
}

#[tokio::test]
async fn unknown_target_exits_1() {
    let dir = tempfile::tempdir().unwrap();
    let (code, out) = run(&["cache"], &settings_for(dir.path(), &["a.pth"])).await;
    assert_eq!(code, EXIT_FAILED);
    assert_eq!(out, "Unknown service type: cache\nHealth check failed for cache\n");
}

#[tokio::test]
async fn missing_argument_prints_usage_and_exits_1() {
    let dir = tempfile::tempdir().unwrap();
    let (code, out) = run(&[], &settings_for(dir.path(), &["a.pth"])).await;
    assert_eq!(code, EXIT_FAILED);
    assert_eq!(out, "Usage: health-check <service_type>\nService types: api, database, redis, models\n");
}

#[tokio::test]
async fn extra_arguments_exit_1() {
    let dir = tempfile::tempdir().unwrap();
    let (code, out) = run(&["models", "api"], &settings_for(dir.path(), &["a.pth"])).await;
    assert_eq!(code, EXIT_FAILED);
    assert!(out.starts_with("Usage: health-check <service_type>\n"));
}

#[tokio::test]
async fn failing_models_check_exits_1_after_every_attempt() {
    let dir = tempfile::tempdir().unwrap();
    let (code, out) = run(&["models"], &settings_for(dir.path(), &["classification.pth"])).await;
    assert_eq!(code, EXIT_FAILED);
    assert_eq!(
        out,
        "models health check failed (attempt 1/2)\n\
         models health check failed (attempt 2/2)\n\
         Health check failed for models\n"
    );
}

#[tokio::test]
async fn passing_models_check_exits_0() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("classification.pth"), b"w").unwrap();
    let (code, out) = run(&["models"], &settings_for(dir.path(), &["classification.pth"])).await;
    assert_eq!(code, EXIT_PASSED);
    assert_eq!(out, "models health check passed (attempt 1/2)\n");
}

#[tokio::test]
async fn misconfigured_check_exits_1_with_error_line() {
    let dir = tempfile::tempdir().unwrap();
    let (code, out) = run(&["models"], &settings_for(dir.path(), &[])).await;
    assert_eq!(code, EXIT_FAILED);
    let mut lines = out.lines();
    assert_eq!(lines.next(), Some("models health check error (attempt 1/2)"));
    assert!(lines.next().unwrap().starts_with("Health check failed for models: "));
}

#[tokio::test]
async fn help_exits_0() {
    let dir = tempfile::tempdir().unwrap();
    let (code, out) = run(&["--help"], &settings_for(dir.path(), &[])).await;
    assert_eq!(code, EXIT_PASSED);
    assert!(out.contains("service_type") || out.contains("SERVICE_TYPE"));
}
