//! Porkbun API endpoint implementations.
//!
//! Each submodule groups related endpoints behind a borrowed view of the
//! client.

mod dnssec;
mod domain;

pub use dnssec::DnssecApi;
pub use domain::DomainApi;
