//! Nameserver control plane.

use async_trait::async_trait;
use dssync_core::{DomainName, Result, SyncError};
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, info};

use super::zonefile::zone_file_name;

/// Registers a new zone with the running nameserver
#[async_trait]
pub trait ZoneControl: Send + Sync {
    /// Add `domain` as a primary zone
    async fn add_zone(&self, domain: &DomainName) -> Result<()>;
}

/// `rndc addzone`
#[derive(Debug, Clone)]
pub struct Rndc {
    program: PathBuf,
    conf: PathBuf,
    extras: Option<String>,
}

impl Rndc {
    /// Use `rndc` from `PATH` with the given configuration file
    #[must_use]
    pub fn new(conf: impl Into<PathBuf>) -> Self {
        Self {
            program: PathBuf::from("rndc"),
            conf: conf.into(),
            extras: None,
        }
    }

    /// Use a different `rndc` binary
    #[must_use]
    pub fn program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Extra statements inserted into the zone definition
    #[must_use]
    pub fn extras(mut self, extras: Option<String>) -> Self {
        self.extras = extras.filter(|e| !e.trim().is_empty());
        self
    }

    /// The zone definition passed to `addzone`
    #[must_use]
    pub fn zone_spec(&self, domain: &DomainName) -> String {
        let file = zone_file_name(domain);
        match &self.extras {
            Some(extras) => format!("{{ type primary; file \"{file}\"; {} }};", extras.trim()),
            None => format!("{{ type primary; file \"{file}\"; }};"),
        }
    }
}

#[async_trait]
impl ZoneControl for Rndc {
    async fn add_zone(&self, domain: &DomainName) -> Result<()> {
        let spec = self.zone_spec(domain);
        debug!(domain = %domain, program = %self.program.display(), spec = %spec, "rndc addzone");

        let output = Command::new(&self.program)
            .arg("-c")
            .arg(&self.conf)
            .arg("addzone")
            .arg(domain.as_str())
            .arg(&spec)
            .output()
            .await
            .map_err(|e| SyncError::Provision {
                step: "rndc",
                message: format!("failed to run {}: {e}", self.program.display()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SyncError::Provision {
                step: "rndc",
                message: format!("addzone exited with {}: {}", output.status, stderr.trim()),
            });
        }

        info!(domain = %domain, "zone added");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example() -> DomainName {
        DomainName::parse("example.com").unwrap()
    }

    #[test]
    fn zone_spec_without_extras() {
        let rndc = Rndc::new("/etc/bind/rndc.conf");
        assert_eq!(
            rndc.zone_spec(&example()),
            r#"{ type primary; file "db.example.com"; };"#
        );
    }

    #[test]
    fn zone_spec_with_extras() {
        let rndc = Rndc::new("/etc/bind/rndc.conf")
            .extras(Some("allow-transfer { key xfr; }; dnssec-policy default;".into()));
        assert_eq!(
            rndc.zone_spec(&example()),
            r#"{ type primary; file "db.example.com"; allow-transfer { key xfr; }; dnssec-policy default; };"#
        );
        assert_eq!(
            Rndc::new("x").extras(Some("  ".into())).zone_spec(&example()),
            r#"{ type primary; file "db.example.com"; };"#
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exit_status_decides_success() {
        assert!(Rndc::new("rndc.conf")
            .program("true")
            .add_zone(&example())
            .await
            .is_ok());

        let err = Rndc::new("rndc.conf")
            .program("false")
            .add_zone(&example())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Provision { step: "rndc", .. }));
    }

    #[tokio::test]
    async fn missing_binary_is_a_provision_error() {
        let err = Rndc::new("rndc.conf")
            .program("/nonexistent/rndc")
            .add_zone(&example())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Provision { step: "rndc", .. }));
    }
}
