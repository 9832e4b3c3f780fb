use thiserror::Error;

/// Result type alias for dssync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that can occur while probing, auditing or reconciling domains
#[derive(Error, Debug)]
pub enum SyncError {
    /// Missing or malformed configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// The registrar rejected the API key pair
    #[error("authentication failed: registrar rejected the API key pair")]
    Unauthorized,

    /// The registrar answered but reported a non-success status
    #[error("registrar error ({code}): {message}")]
    Registrar {
        /// HTTP status code of the response
        code: u16,
        /// Message reported by the registrar
        message: String,
    },

    /// The request never completed (connect, TLS, body read)
    #[error("transport error: {0}")]
    Transport(String),

    /// The request timed out
    #[error("request timed out after {0} seconds")]
    Timeout(u64),

    /// DNS query failure
    #[error("DNS probe failed: {0}")]
    Probe(String),

    /// Refused to act on a domain with no live KSK
    #[error(
        "refusing to reconcile {domain}: no live KSK found, {remote} DS record(s) at the registrar left untouched"
    )]
    SafetyGuard {
        /// Domain that was skipped
        domain: String,
        /// Number of DS records currently published at the registrar
        remote: usize,
    },

    /// Domain name failed validation
    #[error("invalid domain name: {0}")]
    InvalidDomain(String),

    /// DNSKEY or DS data could not be parsed
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// A zone provisioning step failed
    #[error("provisioning step '{step}' failed: {message}")]
    Provision {
        /// Name of the step that failed
        step: &'static str,
        /// Failure description
        message: String,
    },

    /// JSON parsing/serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Returns true if the request never completed
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout(_))
    }

    /// Returns true if the registrar answered and rejected the request
    #[must_use]
    pub const fn is_registrar(&self) -> bool {
        matches!(self, Self::Registrar { .. } | Self::Unauthorized)
    }

    /// Returns true if the error should abort a whole run rather than one domain
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Unauthorized)
    }

    /// Returns true if retrying the same call may succeed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.is_transport()
    }

    /// Returns the HTTP status code if the registrar answered
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::Registrar { code, .. } => Some(*code),
            _ => None,
        }
    }
}
