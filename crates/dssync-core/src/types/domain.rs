use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SyncError};

/// Number of domains the registrar returns per `listAll` page
pub const DOMAIN_PAGE_SIZE: usize = 1000;

const MAX_NAME_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// A validated, lowercase, fully-qualified domain name.
///
/// Stored without the trailing dot. Used as the identity key for every
/// per-domain operation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DomainName(String);

impl DomainName {
    /// Parse and normalize a domain name
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let name = trimmed.strip_suffix('.').unwrap_or(trimmed).to_ascii_lowercase();

        if name.is_empty() {
            return Err(SyncError::InvalidDomain("empty name".into()));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(SyncError::InvalidDomain(format!(
                "{name}: longer than {MAX_NAME_LEN} characters"
            )));
        }
        for label in name.split('.') {
            validate_label(&name, label)?;
        }

        Ok(Self(name))
    }

    /// The name without trailing dot
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name with a trailing dot
    #[must_use]
    pub fn to_fqdn(&self) -> String {
        format!("{}.", self.0)
    }

    /// Iterate over the labels, leftmost first
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// Canonical (lowercase, uncompressed) wire encoding, root label included
    #[must_use]
    pub fn to_wire(&self) -> Vec<u8> {
        let mut wire = Vec::with_capacity(self.0.len() + 2);
        for label in self.labels() {
            // labels are validated to at most 63 octets
            #[allow(clippy::cast_possible_truncation)]
            wire.push(label.len() as u8);
            wire.extend_from_slice(label.as_bytes());
        }
        wire.push(0);
        wire
    }
}

fn validate_label(name: &str, label: &str) -> Result<()> {
    if label.is_empty() {
        return Err(SyncError::InvalidDomain(format!("{name}: empty label")));
    }
    if label.len() > MAX_LABEL_LEN {
        return Err(SyncError::InvalidDomain(format!(
            "{name}: label '{label}' longer than {MAX_LABEL_LEN} characters"
        )));
    }
    if label.starts_with('-') || label.ends_with('-') {
        return Err(SyncError::InvalidDomain(format!(
            "{name}: label '{label}' starts or ends with a hyphen"
        )));
    }
    if let Some(c) = label
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(SyncError::InvalidDomain(format!(
            "{name}: invalid character '{c}'"
        )));
    }
    Ok(())
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DomainName {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DomainName {
    type Error = SyncError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<DomainName> for String {
    fn from(name: DomainName) -> Self {
        name.0
    }
}

impl AsRef<str> for DomainName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Ordered set of nameserver hostnames delegated to a domain.
///
/// Hostnames are lowercased and stored without trailing dot. Duplicates are
/// dropped, first occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NameserverSet(Vec<String>);

impl NameserverSet {
    /// Build a set from hostnames
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Vec::new();
        for host in hosts {
            let host = host.as_ref().trim();
            let host = host.strip_suffix('.').unwrap_or(host).to_ascii_lowercase();
            if !host.is_empty() && !set.contains(&host) {
                set.push(host);
            }
        }
        Self(set)
    }

    /// The hostnames in delegation order
    #[must_use]
    pub fn hosts(&self) -> &[String] {
        &self.0
    }

    /// Iterate over hostnames
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of nameservers
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no nameserver is delegated
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Same hostnames regardless of order
    #[must_use]
    pub fn same_hosts(&self, other: &Self) -> bool {
        self.len() == other.len() && self.0.iter().all(|h| other.0.contains(h))
    }
}

impl fmt::Display for NameserverSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(", "))
    }
}

impl<'a> IntoIterator for &'a NameserverSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A domain known to the registrar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainSummary {
    /// The domain
    pub domain: DomainName,

    /// Registration status (e.g. `ACTIVE`)
    #[serde(default)]
    pub status: Option<String>,

    /// Top-level domain
    #[serde(default)]
    pub tld: Option<String>,

    /// Expiry date as reported by the registrar
    #[serde(default)]
    pub expire_date: Option<String>,

    /// Whether auto-renew is enabled
    #[serde(default)]
    pub auto_renew: Option<bool>,
}

impl DomainSummary {
    /// A summary carrying only the name
    #[must_use]
    pub const fn named(domain: DomainName) -> Self {
        Self {
            domain,
            status: None,
            tld: None,
            expire_date: None,
            auto_renew: None,
        }
    }
}

/// One page of the registrar's domain listing
#[derive(Debug, Clone, Default)]
pub struct DomainPage {
    /// Domains on this page
    pub domains: Vec<DomainSummary>,

    /// True when the page was full and another page may follow
    pub has_more: bool,
}

impl DomainPage {
    /// Build a page, deriving `has_more` from the page size
    #[must_use]
    pub fn from_domains(domains: Vec<DomainSummary>) -> Self {
        let has_more = domains.len() >= DOMAIN_PAGE_SIZE;
        Self { domains, has_more }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_case_and_trailing_dot() {
        let name = DomainName::parse("  Example.COM. ").unwrap();
        assert_eq!(name.as_str(), "example.com");
        assert_eq!(name.to_fqdn(), "example.com.");
    }

    #[test]
    fn parse_rejects_bad_names() {
        assert!(DomainName::parse("").is_err());
        assert!(DomainName::parse(".").is_err());
        assert!(DomainName::parse("example..com").is_err());
        assert!(DomainName::parse("-bad.com").is_err());
        assert!(DomainName::parse("exa mple.com").is_err());
        assert!(DomainName::parse(&format!("{}.com", "a".repeat(64))).is_err());
    }

    #[test]
    fn wire_form_is_length_prefixed() {
        let name = DomainName::parse("DSKEY.example.com").unwrap();
        let mut expected = vec![5];
        expected.extend_from_slice(b"dskey");
        expected.push(7);
        expected.extend_from_slice(b"example");
        expected.push(3);
        expected.extend_from_slice(b"com");
        expected.push(0);
        assert_eq!(name.to_wire(), expected);
    }

    #[test]
    fn serde_validates() {
        let name: DomainName = serde_json::from_str("\"Example.org\"").unwrap();
        assert_eq!(name.as_str(), "example.org");
        assert!(serde_json::from_str::<DomainName>("\"bad name\"").is_err());
    }

    #[test]
    fn nameserver_set_normalizes_and_dedups() {
        let set = NameserverSet::new(["NS1.Example.net.", "ns2.example.net", "ns1.example.net"]);
        assert_eq!(set.hosts(), ["ns1.example.net", "ns2.example.net"]);
        assert!(set.same_hosts(&NameserverSet::new(["ns2.example.net", "ns1.example.net"])));
    }

    #[test]
    fn page_has_more_only_when_full() {
        let full: Vec<_> = (0..DOMAIN_PAGE_SIZE)
            .map(|i| DomainSummary::named(DomainName::parse(&format!("d{i}.com")).unwrap()))
            .collect();
        assert!(DomainPage::from_domains(full).has_more);
        assert!(!DomainPage::from_domains(Vec::new()).has_more);
    }
}
