//! shmake CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use shmake::cli::{Cli, CommandDispatcher};
use shmake::shell::{OutputLevel, Runner};
use shmake::{Result, RunnerConfig};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber for logging.
///
/// Log level is controlled by:
/// 1. `--debug` flag sets level to DEBUG
/// 2. `RUST_LOG` environment variable (if set)
/// 3. Default is INFO
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("shmake=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("shmake=info"))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

/// Resolve the runner config: explicit file or discovery, then the
/// environment, then the `--level` flag.
fn load_config(cli: &Cli) -> Result<RunnerConfig> {
    let config = match &cli.config {
        Some(path) => RunnerConfig::load(path)?,
        None => RunnerConfig::discover(&std::env::current_dir()?)?,
    };
    let mut config = config.with_env_overrides()?;
    if let Some(level) = cli.level {
        config.output_level = OutputLevel::from(level);
    }
    Ok(config)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    tracing::debug!("shmake starting with args: {:?}", cli);

    let result = load_config(&cli).and_then(|config| {
        tracing::debug!("Runner config: {:?}", config);
        CommandDispatcher::new(Runner::new(config)).dispatch(&cli)
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}
