//! Probe configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ProbeError, ProbeResult};

/// Port used when a server is given without one
pub const DEFAULT_DNS_PORT: u16 = 53;

/// Default per-query timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// DNS transport protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// UDP datagrams
    Udp,
    /// TCP stream
    Tcp,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Udp => write!(f, "udp"),
            Self::Tcp => write!(f, "tcp"),
        }
    }
}

impl FromStr for Transport {
    type Err = ProbeError;

    fn from_str(s: &str) -> ProbeResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "udp" => Ok(Self::Udp),
            "tcp" => Ok(Self::Tcp),
            other => Err(ProbeError::Config(format!(
                "unknown DNS transport '{other}' (expected udp or tcp)"
            ))),
        }
    }
}

/// Settings shared by every query a [`DnsProbe`](crate::DnsProbe) sends
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Transport for queries sent to authoritative servers
    pub transport: Transport,
    /// Per-query timeout
    pub timeout: Duration,
    /// Port queried on delegated nameservers
    pub nameserver_port: u16,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            transport: Transport::Udp,
            timeout: DEFAULT_TIMEOUT,
            nameserver_port: DEFAULT_DNS_PORT,
        }
    }
}

impl ProbeConfig {
    /// Defaults for a deployment that does or does not pin an explicit server.
    ///
    /// TCP is used against an explicit server, UDP against delegated ones.
    #[must_use]
    pub fn for_server(server: Option<SocketAddr>) -> Self {
        Self {
            transport: if server.is_some() {
                Transport::Tcp
            } else {
                Transport::Udp
            },
            ..Self::default()
        }
    }

    /// Set the transport
    #[must_use]
    pub const fn transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    /// Set the per-query timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the port queried on delegated nameservers
    #[must_use]
    pub const fn nameserver_port(mut self, port: u16) -> Self {
        self.nameserver_port = port;
        self
    }
}

/// Parse `ip`, `ip:port` or `[ipv6]:port`; the port defaults to 53
pub fn parse_server_addr(s: &str) -> ProbeResult<SocketAddr> {
    let s = s.trim();
    if let Ok(addr) = s.parse::<SocketAddr>() {
        return Ok(addr);
    }
    s.parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, DEFAULT_DNS_PORT))
        .map_err(|_| ProbeError::Config(format!("invalid DNS server address '{s}'")))
}
