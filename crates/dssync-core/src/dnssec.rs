//! Key/DS normalization.
//!
//! Pure functions turning live DNSKEY material into the DS representation
//! the registrar stores:
//!
//! - [`key_tag`]: RFC 4034 Appendix B checksum over the DNSKEY RDATA
//! - [`classify`]: KSK (`flags == 257`) or ZSK
//! - [`to_ds`]: RFC 4034 §5.1.4 digest over owner name and RDATA
//! - [`ksk_ds_set`]: the DS set that should be published for a zone

use ring::digest;
use std::collections::BTreeSet;

use crate::types::{DigestType, DnsKeyRecord, DomainName, DsRecord, KeyRole, KSK_FLAGS};

/// DNSSEC algorithm number of RSA/MD5, which uses a different key tag rule
const ALG_RSAMD5: u8 = 1;

/// Compute the key tag of a DNSKEY.
///
/// For RSA/MD5 keys the tag is the most significant 16 of the least
/// significant 24 bits of the modulus. Every other algorithm uses the
/// ones-complement style checksum over the full RDATA.
#[must_use]
pub fn key_tag(key: &DnsKeyRecord) -> u16 {
    if key.algorithm == ALG_RSAMD5 {
        let k = &key.public_key;
        return if k.len() >= 3 {
            u16::from_be_bytes([k[k.len() - 3], k[k.len() - 2]])
        } else {
            0
        };
    }

    let mut acc: u32 = 0;
    for (i, byte) in key.to_rdata().iter().enumerate() {
        if i & 1 == 0 {
            acc += u32::from(*byte) << 8;
        } else {
            acc += u32::from(*byte);
        }
    }
    acc += (acc >> 16) & 0xFFFF;

    #[allow(clippy::cast_possible_truncation)]
    let tag = (acc & 0xFFFF) as u16;
    tag
}

/// Classify a key by its flags field
#[must_use]
pub const fn classify(key: &DnsKeyRecord) -> KeyRole {
    if key.flags == KSK_FLAGS {
        KeyRole::Ksk
    } else {
        KeyRole::Zsk
    }
}

const fn algorithm_for(digest_type: DigestType) -> &'static digest::Algorithm {
    match digest_type {
        DigestType::Sha1 => &digest::SHA1_FOR_LEGACY_USE_ONLY,
        DigestType::Sha256 => &digest::SHA256,
        DigestType::Sha384 => &digest::SHA384,
    }
}

/// Compute the DS record for `key` published at `owner`.
///
/// `digest = H(canonical owner name | DNSKEY RDATA)`
#[must_use]
pub fn to_ds(owner: &DomainName, key: &DnsKeyRecord, digest_type: DigestType) -> DsRecord {
    let mut ctx = digest::Context::new(algorithm_for(digest_type));
    ctx.update(&owner.to_wire());
    ctx.update(&key.to_rdata());
    let digest = ctx.finish();

    DsRecord {
        key_tag: key_tag(key),
        algorithm: key.algorithm,
        digest_type: digest_type.code(),
        digest: hex::encode_upper(digest.as_ref()),
    }
}

/// The DS set derived from every KSK in `keys`. ZSKs are skipped.
pub fn ksk_ds_set<'a, I>(owner: &DomainName, keys: I, digest_type: DigestType) -> BTreeSet<DsRecord>
where
    I: IntoIterator<Item = &'a DnsKeyRecord>,
{
    keys.into_iter()
        .filter(|k| classify(k) == KeyRole::Ksk)
        .map(|k| to_ds(owner, k, digest_type))
        .collect()
}

/// Key tags of every KSK in `keys`
pub fn ksk_tags<'a, I>(keys: I) -> BTreeSet<u16>
where
    I: IntoIterator<Item = &'a DnsKeyRecord>,
{
    keys.into_iter()
        .filter(|k| classify(k) == KeyRole::Ksk)
        .map(key_tag)
        .collect()
}
