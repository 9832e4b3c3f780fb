//! DS reconciliation.
//!
//! The registrar's DS set is brought in line with the DS set derived from the
//! zone's live KSKs. Records are identified by the 4-tuple
//! `(key tag, algorithm, digest type, digest)`; registrar ids are only used
//! to address deletions. There is no in-place update: a key rollover shows up
//! as one creation plus one deletion.
//!
//! A domain whose live DNSKEY set has no KSK is never touched. Deleting every
//! DS record of a signed zone would break its chain of trust, so an empty
//! local set is treated as a probe problem rather than as intent.

use dssync_core::{dnssec, DomainName, DsRecord, RecordId, RemoteDsRecord, Result, SyncError};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{error, info, warn};

use crate::batch;
use crate::engine::Engine;
use crate::failure::Failure;

/// The changes needed to make the registrar match the live keys
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncPlan {
    /// Local records missing at the registrar
    pub create: Vec<DsRecord>,
    /// Registrar records with no live KSK behind them
    pub delete: Vec<RemoteDsRecord>,
    /// Records present on both sides
    pub unchanged: Vec<DsRecord>,
}

impl SyncPlan {
    /// Returns true if the registrar already matches
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.create.is_empty() && self.delete.is_empty()
    }

    /// Number of registrar calls the plan needs
    #[must_use]
    pub fn change_count(&self) -> usize {
        self.create.len() + self.delete.len()
    }
}

/// Compute the plan turning `remote` into `local`.
///
/// `create = local - remote`, `delete = remote - local`, compared by tuple.
/// Duplicate registrar entries of a wanted tuple are left alone.
#[must_use]
pub fn plan(local: &BTreeSet<DsRecord>, remote: &[RemoteDsRecord]) -> SyncPlan {
    let published: BTreeSet<&DsRecord> = remote.iter().map(|r| &r.record).collect();

    let (unchanged, create): (Vec<DsRecord>, Vec<DsRecord>) = local
        .iter()
        .cloned()
        .partition(|ds| published.contains(ds));

    let delete = remote
        .iter()
        .filter(|r| !local.contains(&r.record))
        .cloned()
        .collect();

    SyncPlan {
        create,
        delete,
        unchanged,
    }
}

/// One registrar mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Action {
    /// Publish a DS record
    Create {
        /// Record to publish
        record: DsRecord,
    },
    /// Remove a published DS record
    Delete {
        /// Registrar id
        id: RecordId,
        /// The record being removed
        record: DsRecord,
    },
}

impl Action {
    /// The record the action concerns
    #[must_use]
    pub const fn record(&self) -> &DsRecord {
        match self {
            Self::Create { record } | Self::Delete { record, .. } => record,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create { record } => write!(f, "create DS {record}"),
            Self::Delete { id, record } => write!(f, "delete DS {record} (id {id})"),
        }
    }
}

/// What happened to an [`Action`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ActionStatus {
    /// Dry run; nothing was sent
    Planned,
    /// The registrar accepted the call
    Applied,
    /// The call failed
    Failed(String),
}

/// An action and its result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionOutcome {
    /// The mutation
    pub action: Action,
    /// Its result
    pub status: ActionStatus,
}

/// Result of reconciling one domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// The domain
    pub domain: DomainName,
    /// The computed plan; absent when the domain failed before planning
    pub plan: Option<SyncPlan>,
    /// One outcome per planned action, creations first
    pub outcomes: Vec<ActionOutcome>,
    /// Domain-level failure (probe, registrar read, safety guard)
    pub error: Option<Failure>,
    /// Whether this was a dry run
    pub dry_run: bool,
}

impl ReconcileReport {
    fn failed(domain: &DomainName, err: &SyncError, dry_run: bool) -> Self {
        Self {
            domain: domain.clone(),
            plan: None,
            outcomes: Vec::new(),
            error: Some(Failure::from(err)),
            dry_run,
        }
    }

    /// Returns true if the domain and every action succeeded
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error.is_none() && self.failed_actions() == 0
    }

    /// Number of actions the registrar accepted
    #[must_use]
    pub fn applied(&self) -> usize {
        self.count(|s| matches!(s, ActionStatus::Applied))
    }

    /// Number of actions that failed
    #[must_use]
    pub fn failed_actions(&self) -> usize {
        self.count(|s| matches!(s, ActionStatus::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&ActionStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

impl Engine {
    /// Reconcile every domain, at most `concurrency` at a time.
    ///
    /// Returns one report per domain in input order. A failing domain never
    /// stops the others.
    pub async fn reconcile(&self, domains: &[DomainName]) -> Vec<ReconcileReport> {
        batch::run_bounded(domains, self.options.concurrency, |domain| {
            self.reconcile_domain(domain)
        })
        .await
    }

    /// Reconcile a single domain
    pub async fn reconcile_domain(&self, domain: &DomainName) -> ReconcileReport {
        match self.try_reconcile(domain).await {
            Ok(report) => report,
            Err(e) => {
                if matches!(e, SyncError::SafetyGuard { .. }) {
                    error!(domain = %domain, error = %e, "safety guard: domain skipped");
                } else {
                    warn!(domain = %domain, error = %e, "reconcile failed");
                }
                ReconcileReport::failed(domain, &e, self.options.dry_run)
            }
        }
    }

    async fn try_reconcile(&self, domain: &DomainName) -> Result<ReconcileReport> {
        let keys = self.live_keys(domain, None).await?;
        let remote = self.registrar.list_ds_records(domain).await?;

        let local = dnssec::ksk_ds_set(domain, &keys, self.options.digest_type);
        if local.is_empty() {
            return Err(SyncError::SafetyGuard {
                domain: domain.to_string(),
                remote: remote.len(),
            });
        }

        let plan = plan(&local, &remote);
        info!(
            domain = %domain,
            create = plan.create.len(),
            delete = plan.delete.len(),
            unchanged = plan.unchanged.len(),
            "planned DS changes"
        );

        let outcomes = if self.options.dry_run {
            planned_actions(&plan)
                .map(|action| ActionOutcome {
                    action,
                    status: ActionStatus::Planned,
                })
                .collect()
        } else {
            self.apply(domain, &plan).await
        };

        Ok(ReconcileReport {
            domain: domain.clone(),
            plan: Some(plan),
            outcomes,
            error: None,
            dry_run: self.options.dry_run,
        })
    }

    /// Execute creations, then deletions. A failed call is recorded and the
    /// remaining calls still run.
    async fn apply(&self, domain: &DomainName, plan: &SyncPlan) -> Vec<ActionOutcome> {
        let mut outcomes = Vec::with_capacity(plan.change_count());

        for action in planned_actions(plan) {
            let result = match &action {
                Action::Create { record } => self
                    .registrar
                    .create_ds_record(domain, record)
                    .await
                    .map(|id| {
                        info!(domain = %domain, key_tag = record.key_tag, record_id = ?id, "created DS");
                    }),
                Action::Delete { id, record } => self
                    .registrar
                    .delete_ds_record(domain, id)
                    .await
                    .map(|()| {
                        info!(domain = %domain, key_tag = record.key_tag, record_id = %id, "deleted DS");
                    }),
            };

            let status = match result {
                Ok(()) => ActionStatus::Applied,
                Err(e) => {
                    warn!(domain = %domain, key_tag = action.record().key_tag, error = %e, "{action} failed");
                    ActionStatus::Failed(e.to_string())
                }
            };
            outcomes.push(ActionOutcome { action, status });
        }

        outcomes
    }
}

fn planned_actions(plan: &SyncPlan) -> impl Iterator<Item = Action> + '_ {
    let creates = plan.create.iter().map(|record| Action::Create {
        record: record.clone(),
    });
    let deletes = plan.delete.iter().map(|remote| Action::Delete {
        id: remote.id.clone(),
        record: remote.record.clone(),
    });
    creates.chain(deletes)
}
