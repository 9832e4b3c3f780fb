//! Configuration management.
//!
//! The config is loaded once per run from TOML, or JSON when the file ends
//! in `.json` (the layout of the older `~/.porkbun-tools.json`). Porkbun
//! credentials may be overridden from the environment.

use directories::{BaseDirs, ProjectDirs};
use dssync::provision::{NsUpdateCatalog, Rndc, TsigKey};
use dssync::{
    parse_server_addr, DigestType, DomainName, EngineOptions, NameserverSet, PorkbunClient,
    ProbeConfig, RateLimit, Result, RetryConfig, SyncError, Transport,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding `api_key`
pub const API_KEY_ENV: &str = "PORKBUN_API_KEY";
/// Environment variable overriding `secret_api_key`
pub const SECRET_API_KEY_ENV: &str = "PORKBUN_SECRET_API_KEY";

const LEGACY_FILE: &str = ".porkbun-tools.json";

/// CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Porkbun API key.
    pub api_key: Option<String>,

    /// Porkbun secret API key.
    pub secret_api_key: Option<String>,

    /// Authoritative server for DNSKEY probing and delegation checks.
    pub dns_server: Option<String>,

    /// DS digest type code.
    pub digest_type: u8,

    /// Probe transport; TCP with `dns_server`, UDP otherwise.
    pub dns_transport: Option<Transport>,

    /// Probe timeout in seconds.
    pub dns_timeout_secs: u64,

    /// Registrar timeout in seconds.
    pub http_timeout_secs: u64,

    /// Retries for registrar calls that never completed.
    pub http_retries: u32,

    /// Registrar request rate cap.
    pub requests_per_second: Option<u32>,

    /// Domains processed concurrently.
    pub concurrency: usize,

    /// Nameservers new zones are delegated to.
    pub name_servers: Vec<String>,

    /// Directory holding zone files.
    pub zone_dir: PathBuf,

    /// `rndc` configuration file.
    pub rndc_conf: Option<PathBuf>,

    /// Extra options for `rndc addzone`.
    pub zone_config_block: Option<String>,

    /// Catalog zone new zones are added to.
    pub catalog_zone: Option<String>,

    /// Primary accepting catalog updates.
    pub catalog_server: Option<String>,

    /// TSIG key name for catalog updates.
    pub catalog_update_keyname: Option<String>,

    /// TSIG secret (base64) for catalog updates.
    pub catalog_update_key: Option<String>,

    /// TSIG algorithm for catalog updates.
    pub catalog_key_algorithm: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            secret_api_key: None,
            dns_server: None,
            digest_type: 2,
            dns_transport: None,
            dns_timeout_secs: 3,
            http_timeout_secs: 15,
            http_retries: 0,
            requests_per_second: None,
            concurrency: dssync::batch::DEFAULT_CONCURRENCY,
            name_servers: Vec::new(),
            zone_dir: PathBuf::from("zones"),
            rndc_conf: None,
            zone_config_block: None,
            catalog_zone: None,
            catalog_server: None,
            catalog_update_keyname: None,
            catalog_update_key: None,
            catalog_key_algorithm: "hmac-sha256".to_string(),
        }
    }
}

impl AppConfig {
    /// Get the default config file path.
    ///
    /// `config.toml` in the platform config directory, or the legacy
    /// `~/.porkbun-tools.json` when only that one exists.
    pub fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "dssync")
            .ok_or_else(|| SyncError::Config("could not determine config directory".into()))?;
        let path = dirs.config_dir().join("config.toml");

        if !path.exists() {
            if let Some(legacy) = BaseDirs::new().map(|b| b.home_dir().join(LEGACY_FILE)) {
                if legacy.exists() {
                    return Ok(legacy);
                }
            }
        }
        Ok(path)
    }

    /// Load, apply environment overrides and validate.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SyncError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let mut config = Self::parse(path, &content)?;
        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse file contents, choosing JSON or TOML by extension.
    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            serde_json::from_str(content)
                .map_err(|e| SyncError::Config(format!("{}: {e}", path.display())))
        } else {
            toml::from_str(content)
                .map_err(|e| SyncError::Config(format!("{}: {e}", path.display())))
        }
    }

    /// Override credentials from the environment.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(API_KEY_ENV).filter(|v| !v.is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(secret) = lookup(SECRET_API_KEY_ENV).filter(|v| !v.is_empty()) {
            self.secret_api_key = Some(secret);
        }
    }

    /// Check value ranges and formats.
    ///
    /// Credentials are checked separately by [`Self::credentials`] so that
    /// `config show` works on an incomplete file.
    pub fn validate(&self) -> Result<()> {
        self.digest()?;
        self.dns_server()?;
        self.name_servers()?;

        if self.dns_timeout_secs == 0 || self.http_timeout_secs == 0 {
            return Err(SyncError::Config("timeouts must be at least 1 second".into()));
        }
        if self.concurrency == 0 {
            return Err(SyncError::Config("concurrency must be at least 1".into()));
        }
        self.catalog_key()?;
        Ok(())
    }

    /// The Porkbun key pair.
    pub fn credentials(&self) -> Result<(&str, &str)> {
        match (self.api_key.as_deref(), self.secret_api_key.as_deref()) {
            (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => Ok((key, secret)),
            _ => Err(SyncError::Config(format!(
                "api_key and secret_api_key are required (or set {API_KEY_ENV} and {SECRET_API_KEY_ENV})"
            ))),
        }
    }

    /// Configured digest type.
    pub fn digest(&self) -> Result<DigestType> {
        DigestType::try_from(self.digest_type)
    }

    /// Configured authoritative server.
    pub fn dns_server(&self) -> Result<Option<SocketAddr>> {
        self.dns_server
            .as_deref()
            .map(|s| parse_server_addr(s).map_err(SyncError::from))
            .transpose()
    }

    /// Nameservers for provisioning.
    pub fn name_servers(&self) -> Result<NameserverSet> {
        for host in &self.name_servers {
            DomainName::parse(host).map_err(|e| SyncError::Config(format!("name_servers: {e}")))?;
        }
        Ok(NameserverSet::new(&self.name_servers))
    }

    /// Engine settings, with command-line overrides.
    pub fn engine_options(
        &self,
        jobs: Option<usize>,
        digest_type: Option<u8>,
        dry_run: bool,
    ) -> Result<EngineOptions> {
        let digest_type = match digest_type {
            Some(code) => DigestType::try_from(code)?,
            None => self.digest()?,
        };
        Ok(EngineOptions {
            digest_type,
            dns_server: self.dns_server()?,
            concurrency: dssync::batch::clamp_concurrency(jobs.unwrap_or(self.concurrency)),
            dry_run,
        })
    }

    /// Probe settings.
    pub fn probe_config(&self) -> Result<ProbeConfig> {
        let mut config = ProbeConfig::for_server(self.dns_server()?)
            .timeout(Duration::from_secs(self.dns_timeout_secs));
        if let Some(transport) = self.dns_transport {
            config = config.transport(transport);
        }
        Ok(config)
    }

    /// Registrar client built from credentials, timeout, retry and rate settings.
    pub fn client(&self) -> Result<PorkbunClient> {
        let (key, secret) = self.credentials()?;
        let rate_limit = match self.requests_per_second {
            Some(n) => Some(RateLimit::per_second(n).ok_or_else(|| {
                SyncError::Config("requests_per_second must be at least 1".into())
            })?),
            None => None,
        };
        PorkbunClient::builder(key, secret)
            .timeout(Duration::from_secs(self.http_timeout_secs))
            .retry(RetryConfig::new().max_retries(self.http_retries))
            .rate_limit(rate_limit)
            .build()
    }

    /// The `rndc` wrapper for provisioning.
    pub fn rndc(&self) -> Result<Rndc> {
        let conf = self
            .rndc_conf
            .as_ref()
            .ok_or_else(|| SyncError::Config("rndc_conf is required for provisioning".into()))?;
        Ok(Rndc::new(conf).extras(self.zone_config_block.clone()))
    }

    fn catalog_key(&self) -> Result<Option<(SocketAddr, DomainName, TsigKey)>> {
        let fields = [
            ("catalog_zone", &self.catalog_zone),
            ("catalog_server", &self.catalog_server),
            ("catalog_update_keyname", &self.catalog_update_keyname),
            ("catalog_update_key", &self.catalog_update_key),
        ];
        let missing: Vec<&str> = fields
            .iter()
            .filter(|(_, v)| v.as_deref().map_or(true, str::is_empty))
            .map(|(name, _)| *name)
            .collect();

        if missing.len() == fields.len() {
            return Ok(None);
        }
        if !missing.is_empty() {
            return Err(SyncError::Config(format!(
                "catalog updates need {} as well",
                missing.join(", ")
            )));
        }

        let (Some(zone), Some(server), Some(name), Some(secret)) = (
            self.catalog_zone.as_deref(),
            self.catalog_server.as_deref(),
            self.catalog_update_keyname.as_deref(),
            self.catalog_update_key.as_deref(),
        ) else {
            return Ok(None);
        };

        let catalog = DomainName::parse(zone)
            .map_err(|e| SyncError::Config(format!("catalog_zone: {e}")))?;
        let server = parse_server_addr(server).map_err(SyncError::from)?;
        let key = TsigKey {
            name: name.to_string(),
            algorithm: self.catalog_key_algorithm.clone(),
            secret: secret.to_string(),
        };
        Ok(Some((server, catalog, key)))
    }

    /// The catalog updater, when catalog updates are configured.
    pub fn catalog(&self) -> Result<Option<NsUpdateCatalog>> {
        Ok(self
            .catalog_key()?
            .map(|(server, catalog, key)| NsUpdateCatalog::new(server, catalog, key)))
    }

    /// A copy safe to print.
    #[must_use]
    pub fn masked(&self) -> Self {
        Self {
            api_key: self.api_key.as_deref().map(mask),
            secret_api_key: self.secret_api_key.as_deref().map(mask),
            catalog_update_key: self.catalog_update_key.as_deref().map(mask),
            ..self.clone()
        }
    }
}

/// Keep the first and last four characters of long secrets.
pub fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() > 12 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "****".to_string()
    }
}
