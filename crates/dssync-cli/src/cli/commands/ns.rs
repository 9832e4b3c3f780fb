//! `dssync ns` - registrar nameservers per domain.

use anyhow::Result;
use colored::Colorize;
use dssync::{DomainName, Failure, NameserverSet};
use serde::Serialize;
use tabled::Tabled;

use super::{resolve_domains, Context};
use crate::cli::args::NsArgs;
use crate::output::{self, cell, OutputFormat};

#[derive(Tabled, Serialize, Debug, PartialEq, Eq)]
struct NsRow {
    #[tabled(rename = "Domain")]
    domain: String,
    #[tabled(rename = "Nameservers")]
    nameservers: String,
    #[tabled(rename = "Error")]
    error: String,
}

/// Serialized form for JSON and YAML
#[derive(Serialize)]
struct NsEntry<'a> {
    domain: &'a DomainName,
    #[serde(skip_serializing_if = "Option::is_none")]
    nameservers: Option<&'a NameserverSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a Failure>,
}

type Lookup = (DomainName, Result<NameserverSet, Failure>);

fn entry((domain, result): &Lookup) -> NsEntry<'_> {
    NsEntry {
        domain,
        nameservers: result.as_ref().ok(),
        error: result.as_ref().err(),
    }
}

fn row((domain, result): &Lookup, sep: &str) -> NsRow {
    match result {
        Ok(ns) => NsRow {
            domain: domain.to_string(),
            nameservers: cell(ns.iter(), sep),
            error: String::new(),
        },
        Err(e) => NsRow {
            domain: domain.to_string(),
            nameservers: String::new(),
            error: e.to_string(),
        },
    }
}

pub async fn execute(ctx: Context, args: NsArgs) -> Result<()> {
    let engine = ctx.default_engine().await?;
    let domains = resolve_domains(&engine, &args.domains).await?;
    let results = engine.nameservers(&domains).await;

    match ctx.output_format {
        OutputFormat::Json => output::print_json(&results.iter().map(entry).collect::<Vec<_>>())?,
        OutputFormat::Yaml => output::print_yaml(&results.iter().map(entry).collect::<Vec<_>>())?,
        OutputFormat::Csv => {
            let rows: Vec<NsRow> = results.iter().map(|r| row(r, " ")).collect();
            output::print_csv(&rows)?;
        }
        OutputFormat::Pretty => {
            if results.is_empty() {
                println!("{}", "No domains found.".yellow());
                return Ok(());
            }
            let rows: Vec<NsRow> = results
                .iter()
                .map(|r| {
                    let mut flat = row(r, "\n");
                    if !flat.error.is_empty() {
                        flat.error = flat.error.red().to_string();
                    }
                    flat
                })
                .collect();
            println!("{}", output::table(&rows));
        }
    }

    Ok(())
}
