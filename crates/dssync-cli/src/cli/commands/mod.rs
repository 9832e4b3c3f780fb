//! Command implementations.

pub mod config;
pub mod list;
pub mod ns;
pub mod provision;
pub mod sync;

use anyhow::{Context as _, Result};
use dssync::{DnsProbe, DomainName, Engine, EngineOptions, PorkbunClient, SyncError};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::config::AppConfig;
use crate::output::OutputFormat;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Loaded configuration
    pub config: Arc<AppConfig>,

    /// Where the configuration came from
    pub config_path: PathBuf,

    /// Output format
    pub output_format: OutputFormat,

    /// `--jobs` override
    pub jobs: Option<usize>,
}

impl Context {
    /// Create a registrar client and check that Porkbun accepts the key pair.
    pub async fn client(&self) -> Result<PorkbunClient> {
        let client = self.config.client()?;
        match client.ping().await {
            Ok(ip) => {
                info!(ip = %ip, "registrar credentials accepted");
                Ok(client)
            }
            Err(SyncError::Unauthorized) => anyhow::bail!(
                "Porkbun rejected the API key pair.\n\n\
                 Check api_key and secret_api_key in {} and that API access\n\
                 is enabled for each domain in the Porkbun dashboard.",
                self.config_path.display()
            ),
            Err(e) => Err(e).context("could not reach the Porkbun API"),
        }
    }

    /// DNS probe for the configured transport and server.
    pub fn probe(&self) -> Result<DnsProbe> {
        Ok(DnsProbe::new(self.config.probe_config()?)?)
    }

    /// Build an engine over the live registrar and probe.
    pub async fn engine(&self, options: EngineOptions) -> Result<Engine> {
        let client = self.client().await?;
        let probe = self.probe()?;
        Ok(Engine::new(Arc::new(client), Arc::new(probe), options))
    }

    /// Engine with default run settings.
    pub async fn default_engine(&self) -> Result<Engine> {
        let options = self.config.engine_options(self.jobs, None, false)?;
        self.engine(options).await
    }
}

/// Parse the requested domains, or list every domain in the account.
pub async fn resolve_domains(engine: &Engine, requested: &[String]) -> Result<Vec<DomainName>> {
    if requested.is_empty() {
        let domains = engine
            .all_domains()
            .await
            .context("could not list domains")?;
        info!(count = domains.len(), "domains in account");
        return Ok(domains);
    }
    parse_domains(requested)
}

/// Parse and dedupe domain arguments, keeping their order.
pub fn parse_domains(requested: &[String]) -> Result<Vec<DomainName>> {
    let mut domains: Vec<DomainName> = Vec::with_capacity(requested.len());
    for arg in requested {
        let domain = DomainName::parse(arg).with_context(|| format!("invalid domain '{arg}'"))?;
        if !domains.contains(&domain) {
            domains.push(domain);
        }
    }
    Ok(domains)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn domain_arguments_are_normalized_and_deduped() {
        let domains = parse_domains(&args(&["Example.COM.", "example.net", "example.com"])).unwrap();
        let names: Vec<&str> = domains.iter().map(DomainName::as_str).collect();
        assert_eq!(names, ["example.com", "example.net"]);
    }

    #[test]
    fn invalid_domain_argument_fails() {
        let err = parse_domains(&args(&["exa mple.com"])).unwrap_err();
        assert!(err.to_string().contains("exa mple.com"));
    }
}
