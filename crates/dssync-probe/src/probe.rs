//! Resolver-backed DNS probe.

use async_trait::async_trait;
use dssync_core::{DnsKeyRecord, DnskeyProbe, DomainName, NameserverSet, ProbeTarget, Result};
use futures_util::future::join_all;
use hickory_resolver::config::{NameServerConfig, ResolverConfig, ResolverOpts};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::proto::rr::RecordType;
use hickory_resolver::proto::serialize::binary::BinEncodable;
use hickory_resolver::proto::xfer::Protocol;
use hickory_resolver::proto::ProtoErrorKind;
use hickory_resolver::{ResolveError, Resolver, TokioResolver};
use std::net::SocketAddr;
use tracing::{debug, warn};

use crate::config::{ProbeConfig, Transport};
use crate::error::{ProbeError, ProbeResult};

/// Sends NS and DNSKEY queries straight to authoritative servers
pub struct DnsProbe {
    config: ProbeConfig,
    system: TokioResolver,
}

impl DnsProbe {
    /// Create a probe. Nameserver hostnames are resolved with the system
    /// resolver; zone queries go directly to the target servers.
    pub fn new(config: ProbeConfig) -> ProbeResult<Self> {
        let system = TokioResolver::builder_tokio()
            .map_err(|e| ProbeError::Config(format!("failed to create system resolver: {e}")))?
            .build();
        Ok(Self { config, system })
    }

    /// The probe configuration
    #[must_use]
    pub const fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// A non-caching, single-attempt resolver that only talks to `servers`.
    ///
    /// In UDP mode every server is also registered over TCP so truncated
    /// answers are retried there.
    fn resolver_for(&self, servers: &[SocketAddr]) -> Resolver<TokioConnectionProvider> {
        let protocols: &[Protocol] = match self.config.transport {
            Transport::Udp => &[Protocol::Udp, Protocol::Tcp],
            Transport::Tcp => &[Protocol::Tcp],
        };
        let name_servers: Vec<NameServerConfig> = protocols
            .iter()
            .flat_map(|protocol| {
                servers
                    .iter()
                    .map(|addr| NameServerConfig::new(*addr, *protocol))
            })
            .collect();

        let mut opts = ResolverOpts::default();
        opts.timeout = self.config.timeout;
        opts.attempts = 1;
        opts.cache_size = 0;
        opts.ndots = 0;
        opts.edns0 = true;

        Resolver::builder_with_config(
            ResolverConfig::from_parts(None, vec![], name_servers),
            TokioConnectionProvider::default(),
        )
        .with_options(opts)
        .build()
    }

    /// Resolve nameserver hostnames to query addresses.
    ///
    /// Hostnames that fail to resolve are skipped; the call fails only when
    /// none resolves.
    async fn nameserver_addrs(
        &self,
        domain: &DomainName,
        nameservers: &NameserverSet,
    ) -> ProbeResult<Vec<SocketAddr>> {
        let lookups = nameservers.iter().map(|host| async move {
            let fqdn = format!("{host}.");
            (host, self.system.lookup_ip(fqdn).await)
        });

        let mut addrs = Vec::new();
        for (host, result) in join_all(lookups).await {
            match result {
                Ok(ips) => {
                    let port = self.config.nameserver_port;
                    addrs.extend(ips.iter().map(|ip| SocketAddr::new(ip, port)));
                }
                Err(e) => warn!(domain = %domain, nameserver = host, error = %e, "nameserver did not resolve"),
            }
        }

        if addrs.is_empty() {
            return Err(ProbeError::NoAddresses(domain.to_string()));
        }
        addrs.sort_unstable();
        addrs.dedup();
        Ok(addrs)
    }

    /// Query DNSKEY at the given servers; NODATA yields an empty list
    async fn query_dnskeys(
        &self,
        domain: &DomainName,
        servers: &[SocketAddr],
    ) -> ProbeResult<Vec<DnsKeyRecord>> {
        debug!(domain = %domain, servers = ?servers, transport = %self.config.transport, "DNSKEY query");

        let resolver = self.resolver_for(servers);
        let lookup = match resolver.lookup(domain.to_fqdn(), RecordType::DNSKEY).await {
            Ok(lookup) => lookup,
            Err(e) if e.is_nx_domain() => return Err(ProbeError::NxDomain(domain.to_string())),
            Err(e) if is_no_data(&e) => {
                debug!(domain = %domain, "zone publishes no DNSKEY");
                return Ok(Vec::new());
            }
            Err(e) => return Err(resolve_error(domain, &e)),
        };

        let malformed = |message: String| ProbeError::Malformed {
            name: domain.to_string(),
            message,
        };

        lookup
            .records()
            .iter()
            .filter(|record| record.record_type() == RecordType::DNSKEY)
            .map(|record| {
                let rdata = record.data().to_bytes().map_err(|e| malformed(e.to_string()))?;
                DnsKeyRecord::from_rdata(&rdata).map_err(|e| malformed(e.to_string()))
            })
            .collect()
    }

    /// NS hostnames for `domain` as answered by `server`
    pub async fn nameservers_at(
        &self,
        domain: &DomainName,
        server: SocketAddr,
    ) -> ProbeResult<Vec<String>> {
        debug!(domain = %domain, server = %server, "NS query");

        let resolver = self.resolver_for(&[server]);
        let no_answer = || ProbeError::NoAnswer {
            name: domain.to_string(),
            rtype: "NS",
        };

        let lookup = match resolver.ns_lookup(domain.to_fqdn()).await {
            Ok(lookup) => lookup,
            Err(e) if e.is_nx_domain() => return Err(ProbeError::NxDomain(domain.to_string())),
            Err(e) if is_no_data(&e) => return Err(no_answer()),
            Err(e) => return Err(resolve_error(domain, &e)),
        };

        let hosts = NameserverSet::new(lookup.iter().map(ToString::to_string));
        if hosts.is_empty() {
            return Err(no_answer());
        }
        Ok(hosts.hosts().to_vec())
    }
}

/// NOERROR with an empty answer section; SERVFAIL, REFUSED and the other
/// failure codes also surface as "no records" but are not NODATA.
fn is_no_data(e: &ResolveError) -> bool {
    matches!(
        e.proto().map(|p| p.kind()),
        Some(ProtoErrorKind::NoRecordsFound {
            response_code: ResponseCode::NoError,
            ..
        })
    )
}

fn resolve_error(domain: &DomainName, e: &ResolveError) -> ProbeError {
    ProbeError::Resolve {
        name: domain.to_string(),
        message: e.to_string(),
    }
}

#[async_trait]
impl DnskeyProbe for DnsProbe {
    async fn resolve_nameservers(
        &self,
        domain: &DomainName,
        server: SocketAddr,
    ) -> Result<Vec<String>> {
        Ok(self.nameservers_at(domain, server).await?)
    }

    async fn resolve_dnskeys(
        &self,
        domain: &DomainName,
        target: ProbeTarget<'_>,
    ) -> Result<Vec<DnsKeyRecord>> {
        let servers = match target {
            ProbeTarget::Server(addr) => vec![addr],
            ProbeTarget::Nameservers(ns) => self.nameserver_addrs(domain, ns).await?,
        };
        Ok(self.query_dnskeys(domain, &servers).await?)
    }
}
