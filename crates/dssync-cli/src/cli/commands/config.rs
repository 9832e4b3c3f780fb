//! `dssync config` - show configuration.

use anyhow::Result;
use colored::Colorize;

use super::Context;
use crate::cli::args::{ConfigArgs, ConfigCommands};
use crate::output::{self, OutputFormat};

pub fn execute(ctx: &Context, args: &ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show_config(ctx),
        ConfigCommands::Path => {
            println!("{}", ctx.config_path.display());
            Ok(())
        }
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    let config = ctx.config.masked();

    match ctx.output_format {
        OutputFormat::Json => output::print_json(&config)?,
        OutputFormat::Yaml => output::print_yaml(&config)?,
        _ => {
            println!(
                "{} {}",
                "Configuration:".bold(),
                ctx.config_path.display().to_string().dimmed()
            );
            println!();
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
