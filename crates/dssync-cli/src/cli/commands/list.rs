//! `dssync list` - audit delegations, live KSKs and published DS records.

use anyhow::Result;
use colored::Colorize;
use dssync::audit::{AuditRow, Column, Verdict};
use serde::Serialize;
use tabled::Tabled;

use super::{resolve_domains, Context};
use crate::cli::args::ListArgs;
use crate::output::{self, cell, OutputFormat};

/// One flattened audit line, for tables and CSV
#[derive(Tabled, Serialize, Debug, PartialEq, Eq)]
struct ListRow {
    #[tabled(rename = "Domain")]
    domain: String,
    #[tabled(rename = "Nameservers")]
    nameservers: String,
    #[tabled(rename = "KSK tags")]
    ksk_tags: String,
    #[tabled(rename = "DS tags")]
    ds_tags: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Notes")]
    notes: String,
}

impl ListRow {
    fn from_audit(row: &AuditRow, sep: &str) -> Self {
        Self {
            domain: row.domain.to_string(),
            nameservers: column(&row.nameservers, |ns| cell(ns.iter(), sep)),
            ksk_tags: column(&row.ksk_tags, |tags| cell(tags, " ")),
            ds_tags: row
                .ds_tags()
                .map_or_else(|| "unknown".to_string(), |tags| cell(tags, " ")),
            status: row.verdict.map(|v| v.to_string()).unwrap_or_default(),
            notes: row.findings.join("; "),
        }
    }
}

fn column<T>(value: &Column<T>, render: impl FnOnce(&T) -> String) -> String {
    match value {
        Column::Known(v) => render(v),
        Column::Unknown(_) => "unknown".to_string(),
    }
}

pub async fn execute(ctx: Context, args: ListArgs) -> Result<()> {
    let engine = ctx.default_engine().await?;
    let domains = resolve_domains(&engine, &args.domains).await?;
    let rows = engine.audit(&domains).await;

    match ctx.output_format {
        OutputFormat::Json => output::print_json(&rows)?,
        OutputFormat::Yaml => output::print_yaml(&rows)?,
        OutputFormat::Csv => {
            let flat: Vec<ListRow> = rows.iter().map(|r| ListRow::from_audit(r, " ")).collect();
            output::print_csv(&flat)?;
        }
        OutputFormat::Pretty => print_pretty(&rows),
    }

    Ok(())
}

fn print_pretty(rows: &[AuditRow]) {
    if rows.is_empty() {
        println!("{}", "No domains found.".yellow());
        return;
    }

    let table_rows: Vec<ListRow> = rows
        .iter()
        .map(|row| {
            let mut flat = ListRow::from_audit(row, "\n");
            flat.status = match row.verdict {
                Some(Verdict::InSync) => flat.status.green().to_string(),
                Some(Verdict::OutOfSync) => flat.status.red().bold().to_string(),
                None => flat.status,
            };
            flat.notes = row.findings.join("\n");
            flat
        })
        .collect();
    println!("{}", output::table(&table_rows));

    let out_of_sync = rows
        .iter()
        .filter(|r| r.verdict == Some(Verdict::OutOfSync))
        .count();
    let degraded = rows
        .iter()
        .filter(|r| r.nameservers.is_unknown() || r.ksk_tags.is_unknown() || r.ds_records.is_unknown())
        .count();

    println!();
    println!(
        "{} {} domain(s), {} out of sync, {} with failed lookups",
        "Summary:".bold(),
        rows.len(),
        out_of_sync.to_string().red(),
        degraded.to_string().yellow()
    );

    for row in rows {
        for (name, reason) in unknown_reasons(row) {
            println!("  {} {} {}: {}", "!".yellow(), row.domain, name, reason.dimmed());
        }
    }
}

fn unknown_reasons(row: &AuditRow) -> Vec<(&'static str, &str)> {
    let mut reasons = Vec::new();
    if let Column::Unknown(r) = &row.nameservers {
        reasons.push(("nameservers", r.as_str()));
    }
    if let Column::Unknown(r) = &row.ksk_tags {
        reasons.push(("dnskey", r.as_str()));
    }
    if let Column::Unknown(r) = &row.ds_records {
        reasons.push(("ds", r.as_str()));
    }
    reasons
}

#[cfg(test)]
mod tests {
    use super::*;
    use dssync::{DomainName, DsRecord, NameserverSet};

    fn row() -> AuditRow {
        AuditRow {
            domain: DomainName::parse("example.com").unwrap(),
            nameservers: Column::Known(NameserverSet::new(["ns1.example.net", "ns2.example.net"])),
            ksk_tags: Column::Known([1, 2].into_iter().collect()),
            ds_records: Column::Known(vec![DsRecord::new(1, 13, 2, "AB").unwrap()]),
            verdict: Some(Verdict::OutOfSync),
            findings: vec!["KSK 2 missing DS".to_string()],
        }
    }

    #[test]
    fn audit_row_flattens() {
        let flat = ListRow::from_audit(&row(), " ");
        assert_eq!(
            flat,
            ListRow {
                domain: "example.com".into(),
                nameservers: "ns1.example.net ns2.example.net".into(),
                ksk_tags: "1 2".into(),
                ds_tags: "1".into(),
                status: "OUT OF SYNC".into(),
                notes: "KSK 2 missing DS".into(),
            }
        );
    }

    #[test]
    fn unknown_columns_render_as_unknown() {
        let mut audit = row();
        audit.ksk_tags = Column::Unknown("timed out".into());
        audit.verdict = None;
        audit.findings.clear();

        let flat = ListRow::from_audit(&audit, " ");
        assert_eq!(flat.ksk_tags, "unknown");
        assert_eq!(flat.status, "");
        assert_eq!(unknown_reasons(&audit), vec![("dnskey", "timed out")]);
    }

    #[test]
    fn empty_sets_render_as_dash() {
        let mut audit = row();
        audit.ksk_tags = Column::Known(std::collections::BTreeSet::new());
        audit.ds_records = Column::Known(Vec::new());
        let flat = ListRow::from_audit(&audit, " ");
        assert_eq!(flat.ksk_tags, "-");
        assert_eq!(flat.ds_tags, "-");
    }
}
