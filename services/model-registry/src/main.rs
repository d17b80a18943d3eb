use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use mlops_core::{init_tracing, load_settings};
use mlops_registry::{ModelRecord, ModelRegistration, ModelRegistry, LATEST};
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

/// Inspect and maintain the model metadata registry.
#[derive(Parser, Debug)]
#[command(name = "model-registry", version)]
struct Cli {
    /// Registry document; defaults to the configured `registry.path`.
    #[arg(long, global = true)]
    registry: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a model version (replaces an existing record with the same name and version).
    Register {
        name: String,
        version: String,
        model_path: String,
        #[arg(long, default_value = "classification")]
        model_type: String,
        /// Metric as KEY=VALUE, repeatable.
        #[arg(long = "metric", value_parser = parse_metric)]
        metrics: Vec<(String, f64)>,
        /// Metadata as KEY=JSON (bare words are stored as strings), repeatable.
        #[arg(long = "meta", value_parser = parse_metadata)]
        metadata: Vec<(String, serde_json::Value)>,
    },
    /// Show one record as JSON.
    Info {
        name: String,
        #[arg(default_value = LATEST)]
        version: String,
    },
    /// List every record.
    List,
    /// Set the status of a record: active, deprecated or archived.
    Status { name: String, version: String, status: String },
    /// Print the artifact path of a record.
    Resolve {
        name: String,
        #[arg(default_value = LATEST)]
        version: String,
        /// Also require the artifact to exist in a supported format.
        #[arg(long)]
        check: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings("model-registry").context("failed to load settings")?;
    init_tracing(&settings.service_name, &settings.log_level)?;

    let path = cli.registry.clone().unwrap_or_else(|| settings.registry.path.clone());
    debug!(path = %path.display(), "opening registry");
    let registry = ModelRegistry::open(path);
    let mut out = std::io::stdout().lock();
    execute(&registry, cli.command, &mut out)
}

fn execute<W: Write>(registry: &ModelRegistry, command: Command, out: &mut W) -> Result<()> {
    match command {
        Command::Register { name, version, model_path, model_type, metrics, metadata } => {
            let mut registration = ModelRegistration::new(name, version, model_path, model_type);
            registration.metrics.extend(metrics);
            registration.metadata.extend(metadata);
            let record = registry.register(registration)?;
            writeln!(out, "Registered model {}", record.key())?;
        }
        Command::Info { name, version } => {
            let record = registry.get_info(&name, &version)?;
            writeln!(out, "{}", serde_json::to_string_pretty(&record)?)?;
        }
        Command::List => {
            let records = registry.list_all()?;
            writeln!(out, "Registered models:")?;
            for (key, record) in &records {
                writeln!(out, "  {}", summary(key, record))?;
            }
        }
        Command::Status { name, version, status } => {
            let record = registry.update_status(&name, &version, &status)?;
            writeln!(out, "{} is now {}", record.key(), record.status)?;
        }
        Command::Resolve { name, version, check } => {
            let path = if check {
                registry.locate_artifact(&name, &version)?.0
            } else {
                registry.resolve_artifact(&name, &version)?
            };
            writeln!(out, "{}", path.display())?;
        }
    }
    Ok(())
}

fn summary(key: &str, record: &ModelRecord) -> String { format!("{key}: {} - {}", record.model_type, record.status) }

fn parse_metric(raw: &str) -> Result<(String, f64)> {
    let (key, value) = split_pair(raw)?;
    let value: f64 = value.parse().with_context(|| format!("metric '{key}' is not a number"))?;
    Ok((key, value))
}

fn parse_metadata(raw: &str) -> Result<(String, serde_json::Value)> {
    let (key, value) = split_pair(raw)?;
    let value = serde_json::from_str(&value).unwrap_or(serde_json::Value::String(value));
    Ok((key, value))
}

fn split_pair(raw: &str) -> Result<(String, String)> {
    match raw.split_once('=') {
        Some((k, v)) if !k.is_empty() => Ok((k.to_string(), v.to_string())),
        _ => Err(anyhow!("expected KEY=VALUE, got '{raw}'")),
    }
}
