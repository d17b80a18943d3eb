use health_check::{run_cli, EXIT_FAILED};
use mlops_core::{init_tracing, load_settings};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let settings = match load_settings("health-check") {
        Ok(settings) => settings,
        Err(e) => {
            println!("Health check failed: cannot load settings: {e:#}");
            return ExitCode::from(EXIT_FAILED);
        }
    };
    if let Err(e) = init_tracing(&settings.service_name, &settings.log_level) {
        eprintln!("tracing disabled: {e:#}");
    }

    let mut stdout = std::io::stdout();
    ExitCode::from(run_cli(std::env::args_os(), &settings.health, &mut stdout).await)
}
