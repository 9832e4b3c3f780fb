//! Catalog zone membership (RFC 9432).
//!
//! A member zone is announced by a PTR record at
//! `<sha1-hex(name)>.zones.<catalog>.`, sent as a TSIG-signed dynamic update.

use async_trait::async_trait;
use dssync_core::{DomainName, Result, SyncError};
use ring::digest;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

/// TTL of the member PTR record
pub const MEMBER_TTL: u32 = 3600;

/// Adds zones to a catalog
#[async_trait]
pub trait CatalogUpdater: Send + Sync {
    /// Announce `domain` as a catalog member
    async fn add_member(&self, domain: &DomainName) -> Result<()>;
}

/// Unique member label: lowercase hex SHA-1 of the domain name
#[must_use]
pub fn member_label(domain: &DomainName) -> String {
    hex::encode(digest::digest(&digest::SHA1_FOR_LEGACY_USE_ONLY, domain.as_str().as_bytes()))
}

/// Owner name of the member PTR record
#[must_use]
pub fn member_owner(domain: &DomainName, catalog: &DomainName) -> String {
    format!("{}.zones.{}", member_label(domain), catalog.to_fqdn())
}

/// TSIG key used to sign catalog updates
#[derive(Clone)]
pub struct TsigKey {
    /// Key name
    pub name: String,
    /// HMAC algorithm, e.g. `hmac-sha256`
    pub algorithm: String,
    /// Base64 secret
    pub secret: String,
}

impl std::fmt::Debug for TsigKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TsigKey")
            .field("name", &self.name)
            .field("algorithm", &self.algorithm)
            .field("secret", &"***")
            .finish()
    }
}

/// Catalog updates through `nsupdate`
#[derive(Debug, Clone)]
pub struct NsUpdateCatalog {
    program: PathBuf,
    server: SocketAddr,
    catalog: DomainName,
    key: TsigKey,
}

impl NsUpdateCatalog {
    /// Update `catalog` on `server`, signing with `key`
    #[must_use]
    pub fn new(server: SocketAddr, catalog: DomainName, key: TsigKey) -> Self {
        Self {
            program: PathBuf::from("nsupdate"),
            server,
            catalog,
            key,
        }
    }

    /// Use a different `nsupdate` binary
    #[must_use]
    pub fn program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// The `nsupdate` input adding `domain`. The key travels on stdin so
    /// the secret never shows up in the process list.
    #[must_use]
    pub fn script(&self, domain: &DomainName) -> String {
        format!(
            "server {} {}\n\
             zone {}\n\
             key {}:{} {}\n\
             update add {} {MEMBER_TTL} IN PTR {}\n\
             send\n",
            self.server.ip(),
            self.server.port(),
            self.catalog.to_fqdn(),
            self.key.algorithm,
            self.key.name,
            self.key.secret,
            member_owner(domain, &self.catalog),
            domain.to_fqdn(),
        )
    }
}

#[async_trait]
impl CatalogUpdater for NsUpdateCatalog {
    async fn add_member(&self, domain: &DomainName) -> Result<()> {
        let failed = |message: String| SyncError::Provision {
            step: "catalog",
            message,
        };

        debug!(domain = %domain, catalog = %self.catalog, server = %self.server, "catalog update");

        // -v: TCP
        let mut child = Command::new(&self.program)
            .arg("-v")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| failed(format!("failed to run {}: {e}", self.program.display())))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(self.script(domain).as_bytes())
                .await
                .map_err(|e| failed(format!("writing update script: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| failed(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(failed(format!(
                "nsupdate exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        info!(domain = %domain, catalog = %self.catalog, "added to catalog");
        Ok(())
    }
}
