//! Registrar wire payloads.
//!
//! Porkbun sends integers as decimal strings (and sometimes as numbers);
//! everything is converted to typed values before leaving this crate.

use dssync_core::{
    DomainName, DomainSummary, DsRecord, RecordId, RemoteDsRecord, Result, SyncError,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Fields every request carries
#[derive(Serialize)]
pub(crate) struct Authenticated<'a, B: Serialize> {
    pub apikey: &'a str,
    pub secretapikey: &'a str,
    #[serde(flatten)]
    pub body: &'a B,
}

/// Request without call-specific fields
#[derive(Serialize)]
pub(crate) struct Empty {}

/// Status discriminator present on every response
#[derive(Deserialize)]
pub(crate) struct Envelope {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl Envelope {
    pub fn is_success(&self) -> bool {
        self.status.eq_ignore_ascii_case("SUCCESS")
    }
}

/// A number the registrar may encode as JSON number or decimal string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum Numeric {
    Int(u64),
    Text(String),
}

impl Numeric {
    pub fn get<T: TryFrom<u64>>(&self, field: &str) -> Result<T> {
        let n = match self {
            Self::Int(n) => *n,
            Self::Text(s) => s.trim().parse::<u64>().map_err(|_| {
                SyncError::InvalidRecord(format!("{field} '{s}' is not a number"))
            })?,
        };
        T::try_from(n).map_err(|_| SyncError::InvalidRecord(format!("{field} {n} out of range")))
    }

    pub fn as_text(&self) -> String {
        match self {
            Self::Int(n) => n.to_string(),
            Self::Text(s) => s.trim().to_owned(),
        }
    }
}

#[derive(Serialize)]
pub(crate) struct ListAllRequest {
    pub start: String,
    #[serde(rename = "includeLabels")]
    pub include_labels: &'static str,
}

#[derive(Deserialize)]
pub(crate) struct ListAllResponse {
    #[serde(default)]
    pub domains: Vec<WireDomain>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireDomain {
    pub domain: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub tld: Option<String>,
    #[serde(default)]
    pub expire_date: Option<String>,
    #[serde(default)]
    pub auto_renew: Option<Numeric>,
}

impl ListAllResponse {
    /// Typed summaries; names the registrar returns that fail validation are skipped
    pub fn into_summaries(self) -> Vec<DomainSummary> {
        self.domains
            .into_iter()
            .filter_map(|d| match DomainName::parse(&d.domain) {
                Ok(domain) => Some(DomainSummary {
                    domain,
                    status: d.status,
                    tld: d.tld,
                    expire_date: d.expire_date,
                    auto_renew: d.auto_renew.and_then(|v| v.get::<u8>("autoRenew").ok()).map(|v| v != 0),
                }),
                Err(e) => {
                    warn!(domain = %d.domain, error = %e, "skipping unparseable domain from registrar");
                    None
                }
            })
            .collect()
    }
}

#[derive(Deserialize)]
pub(crate) struct GetNsResponse {
    #[serde(default)]
    pub ns: Vec<String>,
}

#[derive(Serialize)]
pub(crate) struct UpdateNsRequest<'a> {
    pub ns: &'a [String],
}

#[derive(Deserialize)]
pub(crate) struct DnssecRecordsResponse {
    #[serde(default)]
    pub records: serde_json::Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireDsRecord {
    pub key_tag: Numeric,
    pub alg: Numeric,
    pub digest_type: Numeric,
    pub digest: String,
}

impl DnssecRecordsResponse {
    /// Typed records. A non-object `records` (Porkbun sends `[]`) means none.
    pub fn into_records(self) -> Result<Vec<RemoteDsRecord>> {
        let serde_json::Value::Object(map) = self.records else {
            return Ok(Vec::new());
        };

        map.into_iter()
            .map(|(id, value)| -> Result<RemoteDsRecord> {
                let wire: WireDsRecord = serde_json::from_value(value)?;
                let record = DsRecord::new(
                    wire.key_tag.get("keyTag")?,
                    wire.alg.get("alg")?,
                    wire.digest_type.get("digestType")?,
                    &wire.digest,
                )?;
                Ok(RemoteDsRecord {
                    id: RecordId(id),
                    record,
                })
            })
            .collect()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateDsRequest {
    pub key_tag: String,
    pub alg: String,
    pub digest_type: String,
    pub digest: String,
}

impl From<&DsRecord> for CreateDsRequest {
    fn from(ds: &DsRecord) -> Self {
        Self {
            key_tag: ds.key_tag.to_string(),
            alg: ds.algorithm.to_string(),
            digest_type: ds.digest_type.to_string(),
            digest: ds.digest.to_ascii_uppercase(),
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct CreateDsResponse {
    #[serde(default)]
    pub id: Option<Numeric>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PingResponse {
    #[serde(default)]
    pub your_ip: Option<String>,
}
