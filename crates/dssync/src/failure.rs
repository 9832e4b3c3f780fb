use dssync_core::SyncError;
use serde::Serialize;
use std::fmt;

/// Broad class of a per-domain failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No live KSK; nothing was changed
    SafetyGuard,
    /// DNS lookup failed
    Probe,
    /// The registrar rejected a call
    Registrar,
    /// The registrar could not be reached
    Transport,
    /// Credentials were rejected
    Auth,
    /// Configuration problem
    Config,
    /// Malformed names or records
    Data,
    /// Zone provisioning step failed
    Provision,
}

/// A failure recorded in a report instead of aborting the batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    /// Failure class
    pub kind: FailureKind,
    /// Human-readable description
    pub message: String,
}

impl From<&SyncError> for Failure {
    fn from(err: &SyncError) -> Self {
        let kind = match err {
            SyncError::SafetyGuard { .. } => FailureKind::SafetyGuard,
            SyncError::Probe(_) => FailureKind::Probe,
            SyncError::Registrar { .. } => FailureKind::Registrar,
            SyncError::Transport(_) | SyncError::Timeout(_) => FailureKind::Transport,
            SyncError::Unauthorized => FailureKind::Auth,
            SyncError::Config(_) => FailureKind::Config,
            SyncError::Provision { .. } => FailureKind::Provision,
            SyncError::InvalidDomain(_)
            | SyncError::InvalidRecord(_)
            | SyncError::Json(_)
            | SyncError::Io(_) => FailureKind::Data,
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

impl From<SyncError> for Failure {
    fn from(err: SyncError) -> Self {
        Self::from(&err)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_errors() {
        let guard = Failure::from(SyncError::SafetyGuard {
            domain: "example.com".into(),
            remote: 2,
        });
        assert_eq!(guard.kind, FailureKind::SafetyGuard);
        assert!(guard.message.contains("example.com"));

        assert_eq!(Failure::from(SyncError::Timeout(3)).kind, FailureKind::Transport);
        assert_eq!(Failure::from(SyncError::Unauthorized).kind, FailureKind::Auth);
    }
}
