//! Delegation audit.
//!
//! For each domain the registrar nameservers, the published DS records and
//! the live DNSKEY set are fetched independently. A failed lookup only
//! blanks its own column; the row is still produced.

use dssync_core::{dnssec, DomainName, DsRecord, NameserverSet, Result, SyncError};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, warn};

use crate::batch;
use crate::engine::Engine;

/// A value that may have failed to load
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Column<T> {
    /// Fetched successfully
    Known(T),
    /// Lookup failed; the reason is kept for display
    Unknown(String),
}

impl<T> Column<T> {
    /// The value, if it was fetched
    pub const fn known(&self) -> Option<&T> {
        match self {
            Self::Known(v) => Some(v),
            Self::Unknown(_) => None,
        }
    }

    /// Returns true if the lookup failed
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }

    /// Map the known value
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Column<U> {
        match self {
            Self::Known(v) => Column::Known(f(v)),
            Self::Unknown(reason) => Column::Unknown(reason),
        }
    }
}

impl<T> From<Result<T>> for Column<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(v) => Self::Known(v),
            Err(e) => Self::Unknown(e.to_string()),
        }
    }
}

/// Agreement between live KSKs and published DS records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Every KSK has a DS and every DS has a KSK
    InSync,
    /// The sets differ
    OutOfSync,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InSync => write!(f, "in sync"),
            Self::OutOfSync => write!(f, "OUT OF SYNC"),
        }
    }
}

/// Verdict and findings for a pair of key tag sets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assessment {
    /// `None` when both sets are empty
    pub verdict: Option<Verdict>,
    /// "KSK n missing DS" and "DS n has no live KSK" lines
    pub findings: Vec<String>,
}

/// Compare live KSK tags with published DS tags
#[must_use]
pub fn assess(ksk_tags: &BTreeSet<u16>, ds_tags: &BTreeSet<u16>) -> Assessment {
    let mut findings: Vec<String> = ksk_tags
        .difference(ds_tags)
        .map(|tag| format!("KSK {tag} missing DS"))
        .collect();
    findings.extend(
        ds_tags
            .difference(ksk_tags)
            .map(|tag| format!("DS {tag} has no live KSK")),
    );

    let verdict = if ksk_tags.is_empty() && ds_tags.is_empty() {
        None
    } else if ksk_tags == ds_tags {
        Some(Verdict::InSync)
    } else {
        Some(Verdict::OutOfSync)
    };

    Assessment { verdict, findings }
}

/// One audit line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRow {
    /// The domain
    pub domain: DomainName,
    /// Nameservers delegated at the registrar
    pub nameservers: Column<NameserverSet>,
    /// Key tags of live KSKs
    pub ksk_tags: Column<BTreeSet<u16>>,
    /// DS records published at the registrar
    pub ds_records: Column<Vec<DsRecord>>,
    /// Blank when either side is unknown or both are empty
    pub verdict: Option<Verdict>,
    /// Mismatches between the two sides
    pub findings: Vec<String>,
}

impl AuditRow {
    /// Key tags of the published DS records
    #[must_use]
    pub fn ds_tags(&self) -> Option<BTreeSet<u16>> {
        self.ds_records
            .known()
            .map(|records| records.iter().map(|ds| ds.key_tag).collect())
    }
}

impl Engine {
    /// Audit every domain, at most `concurrency` at a time, in input order
    pub async fn audit(&self, domains: &[DomainName]) -> Vec<AuditRow> {
        batch::run_bounded(domains, self.options.concurrency, |domain| {
            self.audit_domain(domain)
        })
        .await
    }

    /// Audit a single domain
    pub async fn audit_domain(&self, domain: &DomainName) -> AuditRow {
        let (nameservers, ds_records) = tokio::join!(
            self.registrar.get_nameservers(domain),
            self.registrar.list_ds_records(domain),
        );

        let keys = match (&nameservers, self.options.dns_server) {
            (_, Some(_)) | (Ok(_), None) => {
                self.live_keys(domain, nameservers.as_ref().ok()).await
            }
            (Err(_), None) => Err(SyncError::Probe(format!(
                "{domain}: nameservers unavailable"
            ))),
        };

        let nameservers = Column::from(nameservers);
        let ksk_tags = Column::from(keys.map(|keys| dnssec::ksk_tags(&keys)));
        let ds_records = Column::from(
            ds_records.map(|records| records.into_iter().map(|r| r.record).collect::<Vec<_>>()),
        );

        for (column, failed) in [
            ("nameservers", nameservers.is_unknown()),
            ("dnskey", ksk_tags.is_unknown()),
            ("ds", ds_records.is_unknown()),
        ] {
            if failed {
                warn!(domain = %domain, column, "lookup failed, column left unknown");
            }
        }

        let mut row = AuditRow {
            domain: domain.clone(),
            nameservers,
            ksk_tags,
            ds_records,
            verdict: None,
            findings: Vec::new(),
        };

        if let (Some(ksk_tags), Some(ds_tags)) = (row.ksk_tags.known(), row.ds_tags()) {
            let assessment = assess(ksk_tags, &ds_tags);
            debug!(domain = %domain, verdict = ?assessment.verdict, "audited");
            row.verdict = assessment.verdict;
            row.findings = assessment.findings;
        }

        row
    }
}
