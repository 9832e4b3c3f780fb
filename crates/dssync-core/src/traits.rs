//! Collaborator seams the engine is driven through.

use async_trait::async_trait;
use std::net::SocketAddr;

use crate::error::{Result, SyncError};
use crate::types::{
    DnsKeyRecord, DomainName, DomainPage, DomainSummary, DsRecord, NameserverSet, RecordId,
    RemoteDsRecord, DOMAIN_PAGE_SIZE,
};

/// Operations the registrar exposes for a domain portfolio.
///
/// Implementations surface registrar rejections and transport failures as
/// distinct [`SyncError`](crate::SyncError) variants and never retry on their
/// own unless explicitly configured to.
#[async_trait]
pub trait Registrar: Send + Sync {
    /// Fetch one page of domains starting at offset `start`
    async fn list_domains(&self, start: usize) -> Result<DomainPage>;

    /// Nameservers currently delegated at the registrar
    async fn get_nameservers(&self, domain: &DomainName) -> Result<NameserverSet>;

    /// Replace the delegated nameservers with `nameservers`
    async fn update_nameservers(
        &self,
        domain: &DomainName,
        nameservers: &NameserverSet,
    ) -> Result<()>;

    /// DS records published at the registrar
    async fn list_ds_records(&self, domain: &DomainName) -> Result<Vec<RemoteDsRecord>>;

    /// Publish a DS record; returns the new id when the registrar reports one
    async fn create_ds_record(&self, domain: &DomainName, ds: &DsRecord)
        -> Result<Option<RecordId>>;

    /// Remove a published DS record
    async fn delete_ds_record(&self, domain: &DomainName, id: &RecordId) -> Result<()>;

    /// Every domain in the account.
    ///
    /// Walks the pages, advancing the offset by [`DOMAIN_PAGE_SIZE`], and
    /// stops after the first page the registrar returned short or empty.
    async fn list_all_domains(&self) -> Result<Vec<DomainSummary>> {
        let mut domains = Vec::new();
        let mut start = 0;

        loop {
            let page = self.list_domains(start).await?;
            domains.extend(page.domains);

            if !page.has_more {
                break;
            }
            start += DOMAIN_PAGE_SIZE;
        }

        Ok(domains)
    }
}

/// Where DNSKEY queries are sent
#[derive(Debug, Clone, Copy)]
pub enum ProbeTarget<'a> {
    /// The domain's delegated nameservers, resolved to addresses first
    Nameservers(&'a NameserverSet),
    /// A single authoritative server
    Server(SocketAddr),
}

/// DNS lookups the engine needs
#[async_trait]
pub trait DnskeyProbe: Send + Sync {
    /// NS hostnames for `domain` as answered by `server`
    async fn resolve_nameservers(
        &self,
        domain: &DomainName,
        server: SocketAddr,
    ) -> Result<Vec<String>>;

    /// DNSKEY records for `domain`; empty when the zone is unsigned
    async fn resolve_dnskeys(
        &self,
        domain: &DomainName,
        target: ProbeTarget<'_>,
    ) -> Result<Vec<DnsKeyRecord>>;

    /// Confirm that `server` serves the zone.
    ///
    /// Succeeds when at least one NS record is returned; the served set may
    /// differ from the configured one.
    async fn verify_delegation(
        &self,
        domain: &DomainName,
        server: SocketAddr,
    ) -> Result<NameserverSet> {
        let hosts = self.resolve_nameservers(domain, server).await?;
        let served = NameserverSet::new(hosts);
        if served.is_empty() {
            return Err(SyncError::Probe(format!("{domain}: no NS records")));
        }
        Ok(served)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serves `total` synthetic domains in registrar-sized pages
    struct PagedRegistrar {
        total: usize,
        /// Index left off its page, as when a name fails validation
        invalid: Option<usize>,
        calls: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl Registrar for PagedRegistrar {
        async fn list_domains(&self, start: usize) -> Result<DomainPage> {
            self.calls.lock().unwrap().push(start);
            let end = self.total.min(start + DOMAIN_PAGE_SIZE);
            let domains = (start..end)
                .filter(|i| Some(*i) != self.invalid)
                .map(|i| DomainSummary::named(DomainName::parse(&format!("d{i}.com")).unwrap()))
                .collect();
            Ok(DomainPage {
                domains,
                has_more: end - start >= DOMAIN_PAGE_SIZE,
            })
        }

        async fn get_nameservers(&self, _: &DomainName) -> Result<NameserverSet> {
            unimplemented!()
        }

        async fn update_nameservers(&self, _: &DomainName, _: &NameserverSet) -> Result<()> {
            unimplemented!()
        }

        async fn list_ds_records(&self, _: &DomainName) -> Result<Vec<RemoteDsRecord>> {
            unimplemented!()
        }

        async fn create_ds_record(&self, _: &DomainName, _: &DsRecord) -> Result<Option<RecordId>> {
            unimplemented!()
        }

        async fn delete_ds_record(&self, _: &DomainName, _: &RecordId) -> Result<()> {
            unimplemented!()
        }
    }

    fn registrar(total: usize) -> PagedRegistrar {
        PagedRegistrar {
            total,
            invalid: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    #[tokio::test]
    async fn pagination_stops_after_short_page() {
        let reg = registrar(DOMAIN_PAGE_SIZE + 10);
        let all = reg.list_all_domains().await.unwrap();
        assert_eq!(all.len(), DOMAIN_PAGE_SIZE + 10);
        assert_eq!(*reg.calls.lock().unwrap(), vec![0, DOMAIN_PAGE_SIZE]);
    }

    #[tokio::test]
    async fn pagination_stops_on_empty_page() {
        let reg = registrar(2 * DOMAIN_PAGE_SIZE);
        let all = reg.list_all_domains().await.unwrap();
        assert_eq!(all.len(), 2 * DOMAIN_PAGE_SIZE);
        assert_eq!(
            *reg.calls.lock().unwrap(),
            vec![0, DOMAIN_PAGE_SIZE, 2 * DOMAIN_PAGE_SIZE]
        );
    }

    #[tokio::test]
    async fn pagination_continues_past_full_page_with_invalid_name() {
        let reg = PagedRegistrar {
            invalid: Some(17),
            ..registrar(DOMAIN_PAGE_SIZE + 5)
        };
        let all = reg.list_all_domains().await.unwrap();
        assert_eq!(all.len(), DOMAIN_PAGE_SIZE + 4);
        assert_eq!(*reg.calls.lock().unwrap(), vec![0, DOMAIN_PAGE_SIZE]);
    }

    #[tokio::test]
    async fn pagination_single_call_for_empty_account() {
        let reg = registrar(0);
        assert!(reg.list_all_domains().await.unwrap().is_empty());
        assert_eq!(*reg.calls.lock().unwrap(), vec![0]);
    }
}
