use thiserror::Error;

/// Result type alias for probe operations
pub type ProbeResult<T> = std::result::Result<T, ProbeError>;

/// Errors from DNS lookups
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The server answered NXDOMAIN
    #[error("{0}: no such domain")]
    NxDomain(String),

    /// The server answered but returned no records of the requested type
    #[error("{name}: no {rtype} records")]
    NoAnswer {
        /// Queried name
        name: String,
        /// Queried record type
        rtype: &'static str,
    },

    /// None of the delegated nameservers could be resolved to an address
    #[error("{0}: none of the nameservers resolved to an address")]
    NoAddresses(String),

    /// Resolution failed (timeout, SERVFAIL, refused, connection error)
    #[error("{name}: {message}")]
    Resolve {
        /// Queried name
        name: String,
        /// Resolver error
        message: String,
    },

    /// Malformed record in an answer
    #[error("{name}: malformed record: {message}")]
    Malformed {
        /// Queried name
        name: String,
        /// Decode error
        message: String,
    },

    /// Invalid probe configuration
    #[error("{0}")]
    Config(String),
}

impl From<ProbeError> for dssync_core::SyncError {
    fn from(err: ProbeError) -> Self {
        match err {
            ProbeError::Config(msg) => Self::Config(msg),
            other => Self::Probe(other.to_string()),
        }
    }
}
