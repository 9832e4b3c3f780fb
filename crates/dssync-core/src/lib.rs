//! Core types and traits for dssync.
//!
//! This crate provides the foundational pieces shared by the registrar client,
//! the DNS probe and the reconciliation engine:
//!
//! - **Types**: [`DomainName`], [`NameserverSet`], [`DnsKeyRecord`], [`DsRecord`]
//! - **Normalizer**: key tag computation and DNSKEY to DS conversion ([`dnssec`])
//! - **Errors**: the [`SyncError`] taxonomy
//! - **Traits**: the [`Registrar`] and [`DnskeyProbe`] seams the engine is driven through
//!
//! # Example
//!
//! ```rust
//! use dssync_core::{dnssec, DigestType, DnsKeyRecord, DomainName};
//!
//! let owner: DomainName = "example.com".parse().unwrap();
//! let key = DnsKeyRecord::new(257, 13, vec![1, 2, 3, 4]);
//! let ds = dnssec::to_ds(&owner, &key, DigestType::Sha256);
//! assert_eq!(ds.key_tag, key.key_tag());
//! assert_eq!(ds.digest.len(), 64);
//! ```

pub mod dnssec;
mod error;
mod traits;
pub mod types;

pub use error::{Result, SyncError};
pub use traits::{DnskeyProbe, ProbeTarget, Registrar};
pub use types::*;
