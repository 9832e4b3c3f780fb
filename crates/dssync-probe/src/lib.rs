//! DNS lookups for dssync.
//!
//! [`DnsProbe`] answers the two questions the engine asks the DNS: which
//! nameservers does a server report for a domain, and which DNSKEY records
//! does the zone currently publish. It implements
//! [`dssync_core::DnskeyProbe`].
//!
//! Every query is a single attempt with a bounded timeout and no cache, so
//! repeated runs always observe the live zone.

mod config;
mod error;
mod probe;

pub use config::{parse_server_addr, ProbeConfig, Transport, DEFAULT_DNS_PORT};
pub use error::{ProbeError, ProbeResult};
pub use probe::DnsProbe;
