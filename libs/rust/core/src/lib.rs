//! Core shared utilities for the MLOps services: tracing setup and layered settings.

use anyhow::Result;
use once_cell::sync::OnceCell;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub mod settings;

pub use settings::{load_settings, load_settings_from, HealthSettings, RegistrySettings, Settings};

static TRACING_INIT: OnceCell<()> = OnceCell::new();

/// Install the process-wide tracing subscriber.
///
/// `RUST_LOG` wins over `default_level`. Output is JSON when `MLOPS_JSON_LOG` is `1` or `true`.
/// Events are written to stderr; stdout is left to the binaries. Calling this more than once
/// is a no-op.
pub fn init_tracing(service: &str, default_level: &str) -> Result<()> {
    TRACING_INIT.get_or_try_init(|| -> Result<()> {
        let fmt_layer = if json_log_enabled() {
            tracing_subscriber::fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(false)
                .with_writer(std::io::stderr)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_line_number(true)
                .with_writer(std::io::stderr)
                .boxed()
        };
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_level))?;
        tracing_subscriber::registry()
            .with(fmt_layer)
            .with(env_filter)
            .try_init()?;
        Ok(())
    })?;
    info!(target: "mlops", service = %service, "tracing initialized");
    Ok(())
}

fn json_log_enabled() -> bool {
    std::env::var("MLOPS_JSON_LOG")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
