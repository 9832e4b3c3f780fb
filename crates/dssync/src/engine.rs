use dssync_core::{
    DigestType, DnsKeyRecord, DnskeyProbe, DomainName, NameserverSet, ProbeTarget, Registrar,
    Result,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;

use crate::batch::{self, DEFAULT_CONCURRENCY};
use crate::failure::Failure;

/// Settings shared by every per-domain operation of a run
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Digest type for newly computed DS records
    pub digest_type: DigestType,
    /// Explicit authoritative server; when unset DNSKEY queries go to the
    /// delegated nameservers
    pub dns_server: Option<SocketAddr>,
    /// Domains processed concurrently (clamped to `1..=20`)
    pub concurrency: usize,
    /// Compute plans without mutating the registrar
    pub dry_run: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            digest_type: DigestType::default(),
            dns_server: None,
            concurrency: DEFAULT_CONCURRENCY,
            dry_run: false,
        }
    }
}

/// Drives audit and reconciliation over a registrar and a DNS probe
#[derive(Clone)]
pub struct Engine {
    pub(crate) registrar: Arc<dyn Registrar>,
    pub(crate) probe: Arc<dyn DnskeyProbe>,
    pub(crate) options: EngineOptions,
}

impl Engine {
    /// Create an engine over the given collaborators
    pub fn new(
        registrar: Arc<dyn Registrar>,
        probe: Arc<dyn DnskeyProbe>,
        options: EngineOptions,
    ) -> Self {
        Self {
            registrar,
            probe,
            options,
        }
    }

    /// Run options
    #[must_use]
    pub const fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// The registrar the engine mutates
    #[must_use]
    pub fn registrar(&self) -> &dyn Registrar {
        self.registrar.as_ref()
    }

    /// The DNS probe the engine reads live keys from
    #[must_use]
    pub fn probe(&self) -> &dyn DnskeyProbe {
        self.probe.as_ref()
    }

    /// Every domain in the registrar account, sorted
    pub async fn all_domains(&self) -> Result<Vec<DomainName>> {
        let mut domains: Vec<DomainName> = self
            .registrar
            .list_all_domains()
            .await?
            .into_iter()
            .map(|summary| summary.domain)
            .collect();
        domains.sort();
        domains.dedup();
        Ok(domains)
    }

    /// Registrar nameservers for each domain, in input order
    pub async fn nameservers(
        &self,
        domains: &[DomainName],
    ) -> Vec<(DomainName, std::result::Result<NameserverSet, Failure>)> {
        batch::run_bounded(domains, self.options.concurrency, |domain| async move {
            let result = self
                .registrar
                .get_nameservers(domain)
                .await
                .map_err(Failure::from);
            (domain.clone(), result)
        })
        .await
    }

    /// Live DNSKEY set of `domain`.
    ///
    /// Queries the explicit server when one is configured. Otherwise the
    /// delegated nameservers are used, fetched from the registrar unless
    /// the caller already has them.
    pub(crate) async fn live_keys(
        &self,
        domain: &DomainName,
        nameservers: Option<&NameserverSet>,
    ) -> Result<Vec<DnsKeyRecord>> {
        if let Some(server) = self.options.dns_server {
            return self
                .probe
                .resolve_dnskeys(domain, ProbeTarget::Server(server))
                .await;
        }

        let fetched;
        let nameservers = if let Some(ns) = nameservers {
            ns
        } else {
            fetched = self.registrar.get_nameservers(domain).await?;
            &fetched
        };
        debug!(domain = %domain, nameservers = %nameservers, "probing delegated nameservers");

        self.probe
            .resolve_dnskeys(domain, ProbeTarget::Nameservers(nameservers))
            .await
    }
}
