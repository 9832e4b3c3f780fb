//! CLI argument parsing and command dispatch.

pub mod args;
pub mod commands;

use anyhow::Result;
use args::{Cli, Commands, ConfigCommands};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::AppConfig;
use crate::output::OutputFormat;

/// Run the CLI application.
pub async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    if cli.no_color {
        colored::control::set_override(false);
    }

    let config_path = match cli.config {
        Some(path) => path,
        None => AppConfig::default_path()?,
    };

    if let Commands::Config(args) = &cli.command {
        if matches!(args.command, ConfigCommands::Path) {
            println!("{}", config_path.display());
            return Ok(ExitCode::SUCCESS);
        }
    }

    let config = AppConfig::load(&config_path)?;
    tracing::debug!(path = %config_path.display(), "configuration loaded");

    let ctx = commands::Context {
        config: Arc::new(config),
        config_path,
        output_format: cli.output.unwrap_or(OutputFormat::Pretty),
        jobs: cli.jobs,
    };

    match cli.command {
        Commands::List(args) => commands::list::execute(ctx, args).await?,
        Commands::Sync(args) => return commands::sync::execute(ctx, args).await,
        Commands::Provision(args) => commands::provision::execute(ctx, args).await?,
        Commands::Ns(args) => commands::ns::execute(ctx, args).await?,
        Commands::Config(args) => commands::config::execute(&ctx, &args)?,
    }

    Ok(ExitCode::SUCCESS)
}

/// Log to stderr; `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}
