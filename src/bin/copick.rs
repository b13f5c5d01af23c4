//! Copick CLI Binary
//!
//! Read-only inspection of a project: runs, entity trees, picks and diagnostics.

use anyhow::Context as _;
use clap::Parser;
use copick::cli::{map_error, Cli, RunContext};
use copick::config::ConfigLoader;
use copick::logging::{init_logging, LoggingConfig};
use std::process;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init(&cli) {
        eprintln!("{:#}", e);
        process::exit(1);
    }

    let context = match RunContext::new(&cli.config) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Error opening project: {}", e);
            eprintln!("{}", map_error(&e));
            process::exit(1);
        }
    };

    match context.execute(&cli.command) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", map_error(&e));
            process::exit(1);
        }
    }
}

fn init(cli: &Cli) -> anyhow::Result<()> {
    let logging = build_logging_config(cli);
    init_logging(Some(&logging)).context("failed to initialize logging")?;
    info!(config = %cli.config.display(), "copick CLI starting");
    Ok(())
}

/// Logging configuration from CLI args and the project file
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    if !cli.verbose && cli.log_level.is_none() {
        return LoggingConfig {
            level: "off".to_string(),
            ..LoggingConfig::default()
        };
    }

    let mut config = ConfigLoader::load_from_file(&cli.config)
        .ok()
        .and_then(|c| c.logging)
        .unwrap_or_default();

    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    } else if config.level == "warn" {
        config.level = "info".to_string();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }
    config
}
