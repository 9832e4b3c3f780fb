//! Initial zone file.

use dssync_core::{DomainName, NameserverSet, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;

/// File name of a zone inside the zone directory
#[must_use]
pub fn zone_file_name(domain: &DomainName) -> String {
    format!("db.{domain}")
}

/// Render the starter zone: SOA, one NS per nameserver and a placeholder TXT
#[must_use]
pub fn render(domain: &DomainName, nameservers: &NameserverSet) -> String {
    let mut zone = format!(
        "$TTL 86400\n\
         @ IN SOA ns1.{domain}. admin.{domain}. (\n\
         \x20   1 ; Serial\n\
         \x20   3600 ; Refresh\n\
         \x20   1800 ; Retry\n\
         \x20   604800 ; Expire\n\
         \x20   86400 ; Minimum TTL\n\
         )\n\n"
    );
    for ns in nameservers {
        zone.push_str(&format!("@ IN NS {ns}.\n"));
    }
    zone.push_str("@ IN TXT \"This is a placeholder\"\n");
    zone
}

/// Whether the zone file was written by this call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneFileStatus {
    /// Written now
    Created(PathBuf),
    /// Already present; left untouched
    Existing(PathBuf),
}

impl ZoneFileStatus {
    /// Path of the zone file
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Created(p) | Self::Existing(p) => p,
        }
    }
}

/// Create `dir/db.<domain>` unless it exists. An existing file is never
/// overwritten.
pub async fn ensure_zone_file(
    dir: &Path,
    domain: &DomainName,
    nameservers: &NameserverSet,
) -> Result<ZoneFileStatus> {
    fs::create_dir_all(dir).await?;
    let path = dir.join(zone_file_name(domain));

    let mut file = match fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await
    {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            info!(domain = %domain, path = %path.display(), "zone file already exists");
            return Ok(ZoneFileStatus::Existing(path));
        }
        Err(e) => return Err(e.into()),
    };

    file.write_all(render(domain, nameservers).as_bytes()).await?;
    file.flush().await?;
    info!(domain = %domain, path = %path.display(), "created zone file");
    Ok(ZoneFileStatus::Created(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example() -> DomainName {
        DomainName::parse("example.com").unwrap()
    }

    #[test]
    fn template_lists_every_nameserver() {
        let ns = NameserverSet::new(["ns1.example.net", "ns2.example.net"]);
        let zone = render(&example(), &ns);

        assert!(zone.starts_with("$TTL 86400\n@ IN SOA ns1.example.com. admin.example.com. (\n"));
        assert!(zone.contains("    1 ; Serial\n"));
        assert!(zone.contains("    604800 ; Expire\n"));
        assert!(zone.contains("@ IN NS ns1.example.net.\n@ IN NS ns2.example.net.\n"));
        assert!(zone.ends_with("@ IN TXT \"This is a placeholder\"\n"));
    }

    #[tokio::test]
    async fn creates_file_once_and_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let zones = dir.path().join("zones");
        let ns = NameserverSet::new(["ns1.example.net"]);

        let first = ensure_zone_file(&zones, &example(), &ns).await.unwrap();
        assert_eq!(first, ZoneFileStatus::Created(zones.join("db.example.com")));

        std::fs::write(first.path(), "; hand edited\n").unwrap();
        let second = ensure_zone_file(&zones, &example(), &ns).await.unwrap();

        assert!(matches!(second, ZoneFileStatus::Existing(_)));
        assert_eq!(
            std::fs::read_to_string(second.path()).unwrap(),
            "; hand edited\n"
        );
    }
}
