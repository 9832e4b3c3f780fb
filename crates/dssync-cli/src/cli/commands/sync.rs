//! `dssync sync` - reconcile published DS records with live KSKs.

use anyhow::Result;
use colored::Colorize;
use dssync::reconcile::{Action, ActionStatus, ReconcileReport};
use dssync::FailureKind;
use serde::Serialize;
use std::process::ExitCode;
use tabled::Tabled;

use super::{resolve_domains, Context};
use crate::cli::args::SyncArgs;
use crate::output::{self, OutputFormat};

/// Exit status of `sync --strict` when any domain reported an error
pub const STRICT_FAILURE: u8 = 2;

#[derive(Tabled)]
struct SyncRow {
    #[tabled(rename = "Domain")]
    domain: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "DS record")]
    record: String,
    #[tabled(rename = "Result")]
    result: String,
}

/// One CSV line per action, or per domain when there is none
#[derive(Serialize, Debug, PartialEq, Eq)]
struct CsvRow {
    domain: String,
    action: String,
    key_tag: Option<u16>,
    algorithm: Option<u8>,
    digest_type: Option<u8>,
    digest: Option<String>,
    record_id: Option<String>,
    result: String,
}

fn csv_rows(report: &ReconcileReport) -> Vec<CsvRow> {
    let base = |action: &str, result: String| CsvRow {
        domain: report.domain.to_string(),
        action: action.to_string(),
        key_tag: None,
        algorithm: None,
        digest_type: None,
        digest: None,
        record_id: None,
        result,
    };

    if let Some(err) = &report.error {
        return vec![base("none", format!("error: {err}"))];
    }
    if report.outcomes.is_empty() {
        return vec![base("none", "in sync".to_string())];
    }

    report
        .outcomes
        .iter()
        .map(|outcome| {
            let record = outcome.action.record();
            let (op, id) = match &outcome.action {
                Action::Create { .. } => ("create", None),
                Action::Delete { id, .. } => ("delete", Some(id.to_string())),
            };
            CsvRow {
                key_tag: Some(record.key_tag),
                algorithm: Some(record.algorithm),
                digest_type: Some(record.digest_type),
                digest: Some(record.digest.clone()),
                record_id: id,
                ..base(op, status_text(&outcome.status))
            }
        })
        .collect()
}

fn status_text(status: &ActionStatus) -> String {
    match status {
        ActionStatus::Planned => "planned".to_string(),
        ActionStatus::Applied => "applied".to_string(),
        ActionStatus::Failed(e) => format!("failed: {e}"),
    }
}

fn table_rows(report: &ReconcileReport) -> Vec<SyncRow> {
    let domain = report.domain.to_string();

    if let Some(err) = &report.error {
        let label = match err.kind {
            FailureKind::SafetyGuard => "skipped (safety guard)".yellow().bold(),
            _ => "error".red().bold(),
        };
        return vec![SyncRow {
            domain,
            action: "-".into(),
            record: "-".into(),
            result: format!("{label}: {err}"),
        }];
    }

    if report.outcomes.is_empty() {
        let unchanged = report.plan.as_ref().map_or(0, |p| p.unchanged.len());
        return vec![SyncRow {
            domain,
            action: "-".into(),
            record: "-".into(),
            result: format!("{} ({unchanged} unchanged)", "in sync".green()),
        }];
    }

    report
        .outcomes
        .iter()
        .map(|outcome| {
            let action = match &outcome.action {
                Action::Create { .. } => "create".green().to_string(),
                Action::Delete { id, .. } => format!("{} #{id}", "delete".red()),
            };
            let result = match &outcome.status {
                ActionStatus::Planned => "planned".cyan().to_string(),
                ActionStatus::Applied => "applied".green().to_string(),
                ActionStatus::Failed(e) => format!("{} {e}", "failed:".red().bold()),
            };
            SyncRow {
                domain: domain.clone(),
                action,
                record: outcome.action.record().to_string(),
                result,
            }
        })
        .collect()
}

pub async fn execute(ctx: Context, args: SyncArgs) -> Result<ExitCode> {
    let options = ctx
        .config
        .engine_options(ctx.jobs, args.digest_type, args.dry_run)?;
    let engine = ctx.engine(options).await?;
    let domains = resolve_domains(&engine, &args.domains).await?;
    let reports = engine.reconcile(&domains).await;

    match ctx.output_format {
        OutputFormat::Json => output::print_json(&reports)?,
        OutputFormat::Yaml => output::print_yaml(&reports)?,
        OutputFormat::Csv => {
            let rows: Vec<CsvRow> = reports.iter().flat_map(csv_rows).collect();
            output::print_csv(&rows)?;
        }
        OutputFormat::Pretty => print_pretty(&reports, args.dry_run),
    }

    Ok(exit_code(&reports, args.strict))
}

fn print_pretty(reports: &[ReconcileReport], dry_run: bool) {
    if reports.is_empty() {
        println!("{}", "No domains found.".yellow());
        return;
    }

    if dry_run {
        println!("{}", "Dry run: no changes were sent to the registrar.".cyan());
    }

    let rows: Vec<SyncRow> = reports.iter().flat_map(table_rows).collect();
    println!("{}", output::table(&rows));

    let applied: usize = reports.iter().map(ReconcileReport::applied).sum();
    let failed: usize = reports.iter().map(ReconcileReport::failed_actions).sum();
    let errored = reports.iter().filter(|r| r.error.is_some()).count();

    println!();
    println!(
        "{} {} domain(s), {} change(s) applied, {} failed, {} domain(s) skipped",
        "Summary:".bold(),
        reports.len(),
        applied.to_string().green(),
        failed.to_string().red(),
        errored.to_string().yellow()
    );
}

fn exit_code(reports: &[ReconcileReport], strict: bool) -> ExitCode {
    if strict && reports.iter().any(|r| !r.is_ok()) {
        ExitCode::from(STRICT_FAILURE)
    } else {
        ExitCode::SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dssync::reconcile::{ActionOutcome, SyncPlan};
    use dssync::{DomainName, DsRecord, Failure, RecordId, RemoteDsRecord};

    fn ds(tag: u16) -> DsRecord {
        DsRecord::new(tag, 13, 2, "ABCD").unwrap()
    }

    fn report(outcomes: Vec<ActionOutcome>, error: Option<Failure>) -> ReconcileReport {
        ReconcileReport {
            domain: DomainName::parse("example.com").unwrap(),
            plan: error.is_none().then(SyncPlan::default),
            outcomes,
            error,
            dry_run: false,
        }
    }

    fn rotation() -> ReconcileReport {
        report(
            vec![
                ActionOutcome {
                    action: Action::Create { record: ds(2) },
                    status: ActionStatus::Applied,
                },
                ActionOutcome {
                    action: Action::Delete {
                        id: RecordId::from("77"),
                        record: ds(1),
                    },
                    status: ActionStatus::Failed("connection reset".into()),
                },
            ],
            None,
        )
    }

    #[test]
    fn csv_lists_each_action() {
        let rows = csv_rows(&rotation());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].action, "create");
        assert_eq!(rows[0].key_tag, Some(2));
        assert_eq!(rows[0].result, "applied");
        assert_eq!(rows[1].action, "delete");
        assert_eq!(rows[1].record_id.as_deref(), Some("77"));
        assert_eq!(rows[1].result, "failed: connection reset");
    }

    #[test]
    fn csv_reports_domain_errors() {
        let failure = Failure {
            kind: FailureKind::SafetyGuard,
            message: "no live KSK".into(),
        };
        let rows = csv_rows(&report(Vec::new(), Some(failure)));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].result, "error: no live KSK");
        assert_eq!(rows[0].key_tag, None);
    }

    #[test]
    fn in_sync_domain_has_one_row() {
        let rows = csv_rows(&report(Vec::new(), None));
        assert_eq!(rows[0].result, "in sync");
        assert_eq!(table_rows(&report(Vec::new(), None)).len(), 1);
    }

    #[test]
    fn strict_mode_fails_on_any_error() {
        let ok = report(Vec::new(), None);
        let partial = rotation();

        assert_eq!(exit_code(&[ok.clone()], true), ExitCode::SUCCESS);
        assert_eq!(exit_code(&[ok.clone(), partial.clone()], false), ExitCode::SUCCESS);
        assert_eq!(exit_code(&[ok, partial], true), ExitCode::from(STRICT_FAILURE));
    }

    #[test]
    fn pending_remote_records_render() {
        let remote = RemoteDsRecord {
            id: RecordId::from("9"),
            record: ds(4),
        };
        let planned = report(
            vec![ActionOutcome {
                action: Action::Delete {
                    id: remote.id.clone(),
                    record: remote.record,
                },
                status: ActionStatus::Planned,
            }],
            None,
        );
        let rows = table_rows(&planned);
        assert_eq!(rows.len(), 1);
        assert!(rows[0].action.contains("#9"));
        assert!(rows[0].result.contains("planned"));
    }
}
