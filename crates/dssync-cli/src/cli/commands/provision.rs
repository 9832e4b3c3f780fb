//! `dssync provision` - create a zone on the primary and delegate it.

use anyhow::Result;
use colored::Colorize;
use dssync::provision::{ProvisionOptions, ProvisionReport, Provisioner, StepStatus};
use dssync::DomainName;
use serde::Serialize;
use tabled::Tabled;

use super::Context;
use crate::cli::args::ProvisionArgs;
use crate::output::{self, OutputFormat};

#[derive(Tabled, Serialize, Debug, PartialEq, Eq)]
struct StepRow {
    #[tabled(rename = "Step")]
    step: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

fn step_rows(report: &ProvisionReport) -> Vec<StepRow> {
    report
        .steps
        .iter()
        .map(|s| {
            let (status, detail) = match &s.status {
                StepStatus::Done(d) => ("done", d),
                StepStatus::Skipped(d) => ("skipped", d),
                StepStatus::Forced(d) => ("forced", d),
                StepStatus::Failed(d) => ("failed", d),
            };
            StepRow {
                step: s.step.to_string(),
                status: status.to_string(),
                detail: detail.clone(),
            }
        })
        .collect()
}

pub async fn execute(ctx: Context, args: ProvisionArgs) -> Result<()> {
    let domain = DomainName::parse(&args.domain)?;
    let config = &ctx.config;

    let nameservers = config.name_servers()?;
    if nameservers.is_empty() && !args.skip_registrar {
        anyhow::bail!(
            "name_servers is empty in {}; nothing to delegate {} to",
            ctx.config_path.display(),
            domain
        );
    }

    let control = config.rndc()?;
    let catalog = config.catalog()?;
    let probe = ctx.probe()?;
    let registrar = if args.skip_registrar {
        config.client()?
    } else {
        ctx.client().await?
    };

    let options = ProvisionOptions {
        zone_dir: config.zone_dir.clone(),
        nameservers,
        dns_server: config.dns_server()?,
        force: args.force,
        skip_registrar: args.skip_registrar,
    };

    let mut provisioner = Provisioner::new(&registrar, &probe, &control, options);
    if let Some(catalog) = &catalog {
        provisioner = provisioner.with_catalog(catalog);
    }

    let report = provisioner.provision(&domain).await;

    match ctx.output_format {
        OutputFormat::Json => output::print_json(&report)?,
        OutputFormat::Yaml => output::print_yaml(&report)?,
        OutputFormat::Csv => output::print_csv(&step_rows(&report))?,
        OutputFormat::Pretty => print_pretty(&report),
    }

    report.into_result()?;
    Ok(())
}

fn print_pretty(report: &ProvisionReport) {
    println!("{} {}", "Provisioning".bold(), report.domain.to_string().cyan());

    let rows: Vec<StepRow> = step_rows(report)
        .into_iter()
        .map(|mut row| {
            row.status = match row.status.as_str() {
                "done" => row.status.green().to_string(),
                "failed" => row.status.red().bold().to_string(),
                "forced" => row.status.yellow().to_string(),
                _ => row.status.dimmed().to_string(),
            };
            row
        })
        .collect();
    println!("{}", output::table(&rows));

    if report.delegated() {
        println!(
            "{} registrar now delegates to the configured nameservers.",
            "Success:".green().bold()
        );
    }
}
