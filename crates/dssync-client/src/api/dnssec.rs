//! DS record endpoints.

use crate::wire::{CreateDsRequest, CreateDsResponse, DnssecRecordsResponse, Empty};
use crate::PorkbunClient;
use dssync_core::{DomainName, DsRecord, RecordId, RemoteDsRecord, Result};
use tracing::debug;

/// DNSSEC endpoints
pub struct DnssecApi<'a> {
    client: &'a PorkbunClient,
}

impl<'a> DnssecApi<'a> {
    pub(crate) fn new(client: &'a PorkbunClient) -> Self {
        Self { client }
    }

    /// DS records published for `domain`
    pub async fn list(&self, domain: &DomainName) -> Result<Vec<RemoteDsRecord>> {
        let resp: DnssecRecordsResponse = self
            .client
            .call(&["dns", "getDnssecRecords", domain.as_str()], &Empty {})
            .await?;
        let records = resp.into_records()?;
        debug!(domain = %domain, count = records.len(), "fetched DS records");
        Ok(records)
    }

    /// Publish a DS record
    pub async fn create(&self, domain: &DomainName, ds: &DsRecord) -> Result<Option<RecordId>> {
        let resp: CreateDsResponse = self
            .client
            .call(
                &["dns", "createDnssecRecord", domain.as_str()],
                &CreateDsRequest::from(ds),
            )
            .await?;
        Ok(resp.id.map(|id| RecordId(id.as_text())))
    }

    /// Delete a DS record by registrar id
    pub async fn delete(&self, domain: &DomainName, id: &RecordId) -> Result<()> {
        let _: serde_json::Value = self
            .client
            .call(
                &["dns", "deleteDnssecRecord", domain.as_str(), id.0.as_str()],
                &Empty {},
            )
            .await?;
        Ok(())
    }
}
