//! Domain listing and nameserver endpoints.

use crate::wire::{Empty, GetNsResponse, ListAllRequest, ListAllResponse, UpdateNsRequest};
use crate::PorkbunClient;
use dssync_core::{DomainName, DomainPage, NameserverSet, Result, DOMAIN_PAGE_SIZE};
use tracing::info;

/// Domain endpoints
pub struct DomainApi<'a> {
    client: &'a PorkbunClient,
}

impl<'a> DomainApi<'a> {
    pub(crate) fn new(client: &'a PorkbunClient) -> Self {
        Self { client }
    }

    /// List one page of domains in the account, starting at offset `start`
    pub async fn list(&self, start: usize) -> Result<DomainPage> {
        let request = ListAllRequest {
            start: start.to_string(),
            include_labels: "no",
        };
        let resp: ListAllResponse = self
            .client
            .call(&["domain", "listAll"], &request)
            .await?;
        let has_more = resp.domains.len() >= DOMAIN_PAGE_SIZE;
        Ok(DomainPage {
            domains: resp.into_summaries(),
            has_more,
        })
    }

    /// Nameservers delegated at the registrar
    pub async fn nameservers(&self, domain: &DomainName) -> Result<NameserverSet> {
        let resp: GetNsResponse = self
            .client
            .call(&["domain", "getNs", domain.as_str()], &Empty {})
            .await?;
        Ok(NameserverSet::new(resp.ns))
    }

    /// Replace the delegated nameservers
    pub async fn update_nameservers(
        &self,
        domain: &DomainName,
        nameservers: &NameserverSet,
    ) -> Result<()> {
        let request = UpdateNsRequest {
            ns: nameservers.hosts(),
        };
        let _: serde_json::Value = self
            .client
            .call(&["domain", "updateNs", domain.as_str()], &request)
            .await?;
        info!(domain = %domain, nameservers = %nameservers, "updated delegation");
        Ok(())
    }
}
