use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SyncError};

/// DNSKEY flags value of a Key-Signing Key (Zone Key + Secure Entry Point)
pub const KSK_FLAGS: u16 = 257;

/// The only DNSKEY protocol value defined (RFC 4034 §2.1.2)
pub const DNSKEY_PROTOCOL: u8 = 3;

/// Role of a DNSKEY in the zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum KeyRole {
    /// Key-Signing Key, anchored in the parent through a DS record
    Ksk,
    /// Zone-Signing Key, never published as DS
    Zsk,
}

impl fmt::Display for KeyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ksk => write!(f, "KSK"),
            Self::Zsk => write!(f, "ZSK"),
        }
    }
}

/// DS digest algorithm
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DigestType {
    /// SHA-1 (RFC 3658)
    Sha1,
    /// SHA-256 (RFC 4509)
    #[default]
    Sha256,
    /// SHA-384 (RFC 6605)
    Sha384,
}

impl DigestType {
    /// IANA digest type code
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Sha1 => 1,
            Self::Sha256 => 2,
            Self::Sha384 => 4,
        }
    }

    /// Digest length in bytes
    #[must_use]
    pub const fn digest_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
        }
    }
}

impl TryFrom<u8> for DigestType {
    type Error = SyncError;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            1 => Ok(Self::Sha1),
            2 => Ok(Self::Sha256),
            4 => Ok(Self::Sha384),
            other => Err(SyncError::Config(format!(
                "unsupported DS digest type {other} (supported: 1 = SHA-1, 2 = SHA-256, 4 = SHA-384)"
            ))),
        }
    }
}

impl From<DigestType> for u8 {
    fn from(t: DigestType) -> Self {
        t.code()
    }
}

impl fmt::Display for DigestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha1 => write!(f, "SHA-1"),
            Self::Sha256 => write!(f, "SHA-256"),
            Self::Sha384 => write!(f, "SHA-384"),
        }
    }
}

/// A DNSKEY record as served by the zone.
///
/// The key tag is not stored; it is derived from the other fields by
/// [`DnsKeyRecord::key_tag`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DnsKeyRecord {
    /// Flags field (257 = KSK, 256 = ZSK)
    pub flags: u16,
    /// Protocol field, always 3
    pub protocol: u8,
    /// DNSSEC algorithm number
    pub algorithm: u8,
    /// Public key material
    pub public_key: Vec<u8>,
}

impl DnsKeyRecord {
    /// Create a key with the standard protocol value
    #[must_use]
    pub const fn new(flags: u16, algorithm: u8, public_key: Vec<u8>) -> Self {
        Self {
            flags,
            protocol: DNSKEY_PROTOCOL,
            algorithm,
            public_key,
        }
    }

    /// Decode DNSKEY RDATA: flags (2) | protocol (1) | algorithm (1) | key
    pub fn from_rdata(rdata: &[u8]) -> Result<Self> {
        if rdata.len() < 4 {
            return Err(SyncError::InvalidRecord(format!(
                "DNSKEY RDATA too short: {} bytes",
                rdata.len()
            )));
        }

        Ok(Self {
            flags: u16::from_be_bytes([rdata[0], rdata[1]]),
            protocol: rdata[2],
            algorithm: rdata[3],
            public_key: rdata[4..].to_vec(),
        })
    }

    /// Encode as DNSKEY RDATA
    #[must_use]
    pub fn to_rdata(&self) -> Vec<u8> {
        let mut rdata = Vec::with_capacity(4 + self.public_key.len());
        rdata.extend_from_slice(&self.flags.to_be_bytes());
        rdata.push(self.protocol);
        rdata.push(self.algorithm);
        rdata.extend_from_slice(&self.public_key);
        rdata
    }

    /// RFC 4034 Appendix B key tag
    #[must_use]
    pub fn key_tag(&self) -> u16 {
        crate::dnssec::key_tag(self)
    }

    /// KSK or ZSK
    #[must_use]
    pub fn role(&self) -> KeyRole {
        crate::dnssec::classify(self)
    }

    /// Returns true for a Key-Signing Key
    #[must_use]
    pub fn is_ksk(&self) -> bool {
        self.role() == KeyRole::Ksk
    }
}

/// Parses presentation format RDATA: `257 3 13 <base64 key>`.
///
/// Whitespace inside the base64 key is ignored.
impl FromStr for DnsKeyRecord {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        let mut fields = s.split_whitespace();
        let mut next_number = |what: &str| {
            fields
                .next()
                .ok_or_else(|| SyncError::InvalidRecord(format!("DNSKEY missing {what}")))
                .map(str::to_owned)
        };

        let flags = next_number("flags")?;
        let protocol = next_number("protocol")?;
        let algorithm = next_number("algorithm")?;
        let key: String = fields.collect();

        let invalid = |what: &str, value: &str| {
            SyncError::InvalidRecord(format!("DNSKEY {what} '{value}' is not a number"))
        };

        Ok(Self {
            flags: flags.parse().map_err(|_| invalid("flags", &flags))?,
            protocol: protocol.parse().map_err(|_| invalid("protocol", &protocol))?,
            algorithm: algorithm.parse().map_err(|_| invalid("algorithm", &algorithm))?,
            public_key: BASE64
                .decode(key.as_bytes())
                .map_err(|e| SyncError::InvalidRecord(format!("DNSKEY key is not base64: {e}")))?,
        })
    }
}

impl fmt::Display for DnsKeyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.flags,
            self.protocol,
            self.algorithm,
            BASE64.encode(&self.public_key)
        )
    }
}

/// A DS record, identified by the 4-tuple (key tag, algorithm, digest type, digest).
///
/// The digest is kept as uppercase hex so that equality is case-insensitive
/// with respect to the input.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DsRecord {
    /// Key tag of the DNSKEY the digest was computed from
    pub key_tag: u16,
    /// DNSSEC algorithm of that DNSKEY
    pub algorithm: u8,
    /// Digest algorithm code
    pub digest_type: u8,
    /// Uppercase hex digest
    pub digest: String,
}

impl DsRecord {
    /// Build a DS record, validating and uppercasing the hex digest
    pub fn new(key_tag: u16, algorithm: u8, digest_type: u8, digest: &str) -> Result<Self> {
        let digest: String = digest.split_whitespace().collect::<String>().to_ascii_uppercase();
        if digest.is_empty() {
            return Err(SyncError::InvalidRecord(format!(
                "DS {key_tag}: empty digest"
            )));
        }
        hex::decode(&digest).map_err(|e| {
            SyncError::InvalidRecord(format!("DS {key_tag}: digest is not hex: {e}"))
        })?;

        Ok(Self {
            key_tag,
            algorithm,
            digest_type,
            digest,
        })
    }
}

impl fmt::Display for DsRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.key_tag, self.algorithm, self.digest_type, self.digest
        )
    }
}

/// Opaque identifier the registrar assigns to a published DS record
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A DS record as published at the registrar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDsRecord {
    /// Registrar-assigned id, only used to address deletion
    pub id: RecordId,
    /// The record itself
    #[serde(flatten)]
    pub record: DsRecord,
}
