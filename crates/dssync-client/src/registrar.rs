use async_trait::async_trait;
use dssync_core::{
    DomainName, DomainPage, DsRecord, NameserverSet, RecordId, Registrar, RemoteDsRecord, Result,
};

use crate::PorkbunClient;

#[async_trait]
impl Registrar for PorkbunClient {
    async fn list_domains(&self, start: usize) -> Result<DomainPage> {
        self.domains().list(start).await
    }

    async fn get_nameservers(&self, domain: &DomainName) -> Result<NameserverSet> {
        self.domains().nameservers(domain).await
    }

    async fn update_nameservers(
        &self,
        domain: &DomainName,
        nameservers: &NameserverSet,
    ) -> Result<()> {
        self.domains().update_nameservers(domain, nameservers).await
    }

    async fn list_ds_records(&self, domain: &DomainName) -> Result<Vec<RemoteDsRecord>> {
        self.dnssec().list(domain).await
    }

    async fn create_ds_record(
        &self,
        domain: &DomainName,
        ds: &DsRecord,
    ) -> Result<Option<RecordId>> {
        self.dnssec().create(domain, ds).await
    }

    async fn delete_ds_record(&self, domain: &DomainName, id: &RecordId) -> Result<()> {
        self.dnssec().delete(domain, id).await
    }
}
