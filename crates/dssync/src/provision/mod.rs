//! Zone provisioning.
//!
//! Brings a new zone up on the primary and only then delegates it at the
//! registrar:
//!
//! 1. write the starter zone file (never overwriting)
//! 2. `rndc addzone`
//! 3. announce the zone in the catalog, when one is configured
//! 4. check that the primary answers NS queries for the zone
//! 5. point the registrar delegation at the configured nameservers
//!
//! Step 5 runs only if steps 1, 3 and 4 succeeded. A failed step 2 stops
//! the run unless `force` is set.

pub mod catalog;
pub mod control;
pub mod zonefile;

use dssync_core::{DnskeyProbe, DomainName, NameserverSet, Registrar, Result, SyncError};
use serde::Serialize;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{error, info, warn};

pub use catalog::{CatalogUpdater, NsUpdateCatalog, TsigKey};
pub use control::{Rndc, ZoneControl};
pub use zonefile::{ensure_zone_file, ZoneFileStatus};

/// Provisioning steps, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Starter zone file
    ZoneFile,
    /// `rndc addzone`
    ControlPlane,
    /// Catalog membership
    Catalog,
    /// NS query against the primary
    Verify,
    /// Registrar nameserver update
    Delegate,
}

impl Step {
    const fn name(self) -> &'static str {
        match self {
            Self::ZoneFile => "zone-file",
            Self::ControlPlane => "rndc",
            Self::Catalog => "catalog",
            Self::Verify => "verify",
            Self::Delegate => "delegate",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum StepStatus {
    /// Completed
    Done(String),
    /// Not run
    Skipped(String),
    /// Failed but the run continued because `force` was set
    Forced(String),
    /// Failed; the run stopped here
    Failed(String),
}

/// A step and its status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    /// The step
    pub step: Step,
    /// Its status
    pub status: StepStatus,
}

/// Outcome of provisioning one domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionReport {
    /// The domain
    pub domain: DomainName,
    /// Steps that ran or were skipped, in order
    pub steps: Vec<StepReport>,
}

impl ProvisionReport {
    /// The step that stopped the run, if any
    #[must_use]
    pub fn failure(&self) -> Option<&StepReport> {
        self.steps
            .iter()
            .find(|s| matches!(s.status, StepStatus::Failed(_)))
    }

    /// Returns true if the registrar delegation was updated
    #[must_use]
    pub fn delegated(&self) -> bool {
        self.steps
            .iter()
            .any(|s| s.step == Step::Delegate && matches!(s.status, StepStatus::Done(_)))
    }

    /// `Err` carrying the failing step, if any
    pub fn into_result(self) -> Result<Self> {
        let failed = self.failure().and_then(|report| match &report.status {
            StepStatus::Failed(message) => Some((report.step, message.clone())),
            _ => None,
        });
        match failed {
            Some((step, message)) => Err(SyncError::Provision {
                step: step.name(),
                message,
            }),
            None => Ok(self),
        }
    }

    fn push(&mut self, step: Step, status: StepStatus) {
        match &status {
            StepStatus::Done(detail) => info!(domain = %self.domain, %step, detail = detail.as_str(), "step done"),
            StepStatus::Skipped(reason) => info!(domain = %self.domain, %step, reason = reason.as_str(), "step skipped"),
            StepStatus::Forced(message) => {
                warn!(domain = %self.domain, %step, error = message.as_str(), "step failed, continuing (forced)");
            }
            StepStatus::Failed(message) => {
                error!(domain = %self.domain, %step, error = message.as_str(), "step failed");
            }
        }
        self.steps.push(StepReport { step, status });
    }
}

/// Provisioning settings
#[derive(Debug, Clone)]
pub struct ProvisionOptions {
    /// Directory holding zone files
    pub zone_dir: PathBuf,
    /// Nameservers to delegate to
    pub nameservers: NameserverSet,
    /// Primary to verify the zone against
    pub dns_server: Option<SocketAddr>,
    /// Continue past a failed `rndc addzone`
    pub force: bool,
    /// Stop after verification; leave the registrar alone
    pub skip_registrar: bool,
}

/// Runs the provisioning steps for a domain
pub struct Provisioner<'a> {
    registrar: &'a dyn Registrar,
    probe: &'a dyn DnskeyProbe,
    control: &'a dyn ZoneControl,
    catalog: Option<&'a dyn CatalogUpdater>,
    options: ProvisionOptions,
}

impl<'a> Provisioner<'a> {
    /// Create a provisioner
    pub fn new(
        registrar: &'a dyn Registrar,
        probe: &'a dyn DnskeyProbe,
        control: &'a dyn ZoneControl,
        options: ProvisionOptions,
    ) -> Self {
        Self {
            registrar,
            probe,
            control,
            catalog: None,
            options,
        }
    }

    /// Announce new zones in a catalog
    #[must_use]
    pub fn with_catalog(mut self, catalog: &'a dyn CatalogUpdater) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Provision `domain`. Always returns a report; use
    /// [`ProvisionReport::into_result`] to turn a stopped run into an error.
    pub async fn provision(&self, domain: &DomainName) -> ProvisionReport {
        let mut report = ProvisionReport {
            domain: domain.clone(),
            steps: Vec::new(),
        };
        let opts = &self.options;

        match ensure_zone_file(&opts.zone_dir, domain, &opts.nameservers).await {
            Ok(ZoneFileStatus::Created(path)) => {
                report.push(Step::ZoneFile, StepStatus::Done(format!("created {}", path.display())));
            }
            Ok(ZoneFileStatus::Existing(path)) => {
                report.push(Step::ZoneFile, StepStatus::Done(format!("kept existing {}", path.display())));
            }
            Err(e) => {
                report.push(Step::ZoneFile, StepStatus::Failed(e.to_string()));
                return report;
            }
        }

        match self.control.add_zone(domain).await {
            Ok(()) => report.push(Step::ControlPlane, StepStatus::Done("zone added".into())),
            Err(e) if opts.force => report.push(Step::ControlPlane, StepStatus::Forced(e.to_string())),
            Err(e) => {
                report.push(Step::ControlPlane, StepStatus::Failed(e.to_string()));
                return report;
            }
        }

        match self.catalog {
            Some(catalog) => match catalog.add_member(domain).await {
                Ok(()) => report.push(Step::Catalog, StepStatus::Done("member added".into())),
                Err(e) => {
                    report.push(Step::Catalog, StepStatus::Failed(e.to_string()));
                    return report;
                }
            },
            None => report.push(Step::Catalog, StepStatus::Skipped("no catalog configured".into())),
        }

        if !self.verify(domain, &mut report).await {
            return report;
        }

        self.delegate(domain, &mut report).await;
        report
    }

    async fn verify(&self, domain: &DomainName, report: &mut ProvisionReport) -> bool {
        let opts = &self.options;
        let Some(server) = opts.dns_server else {
            if opts.skip_registrar {
                report.push(Step::Verify, StepStatus::Skipped("no dns_server configured".into()));
                return true;
            }
            report.push(
                Step::Verify,
                StepStatus::Failed("no dns_server configured to verify against".into()),
            );
            return false;
        };

        match self.probe.verify_delegation(domain, server).await {
            Ok(served) => {
                if !opts.nameservers.is_empty() && !served.same_hosts(&opts.nameservers) {
                    warn!(
                        domain = %domain,
                        served = %served,
                        configured = %opts.nameservers,
                        "served NS set differs from configured nameservers"
                    );
                }
                report.push(Step::Verify, StepStatus::Done(format!("served NS: {served}")));
                true
            }
            Err(e) => {
                report.push(Step::Verify, StepStatus::Failed(e.to_string()));
                false
            }
        }
    }

    async fn delegate(&self, domain: &DomainName, report: &mut ProvisionReport) {
        let opts = &self.options;
        if opts.skip_registrar {
            report.push(Step::Delegate, StepStatus::Skipped("registrar update disabled".into()));
            return;
        }
        if opts.nameservers.is_empty() {
            report.push(Step::Delegate, StepStatus::Failed("no name_servers configured".into()));
            return;
        }

        match self.registrar.get_nameservers(domain).await {
            Ok(current) if current.same_hosts(&opts.nameservers) => {
                report.push(Step::Delegate, StepStatus::Done(format!("already delegated to {current}")));
                return;
            }
            Ok(current) => info!(domain = %domain, current = %current, "current delegation"),
            Err(e) => warn!(domain = %domain, error = %e, "could not read current delegation"),
        }

        match self.registrar.update_nameservers(domain, &opts.nameservers).await {
            Ok(()) => report.push(
                Step::Delegate,
                StepStatus::Done(format!("delegated to {}", opts.nameservers)),
            ),
            Err(e) => report.push(Step::Delegate, StepStatus::Failed(e.to_string())),
        }
    }
}
