use std::fmt;

use crate::repo::RepositoryError;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    InvalidProjectId,
    MissingIdentity,
    InvalidIdentity,
    TaskReadFailed,
    CostReadFailed,
    SnapshotWriteFailed,
    SnapshotReadFailed,
    InvalidSnapshot,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::InvalidProjectId => "E2001",
            Self::MissingIdentity => "E2002",
            Self::InvalidIdentity => "E2003",
            Self::TaskReadFailed => "E3001",
            Self::CostReadFailed => "E3002",
            Self::SnapshotWriteFailed => "E4001",
            Self::SnapshotReadFailed => "E4002",
            Self::InvalidSnapshot => "E4003",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Project store not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::InvalidProjectId => "Invalid project identifier",
            Self::MissingIdentity => "Caller identity missing",
            Self::InvalidIdentity => "Caller identity invalid",
            Self::TaskReadFailed => "Task store read failed",
            Self::CostReadFailed => "Cost ledger read failed",
            Self::SnapshotWriteFailed => "Health snapshot write failed",
            Self::SnapshotReadFailed => "Health snapshot read failed",
            Self::InvalidSnapshot => "Invalid health snapshot",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `sp init` to create the .sitepulse/ store."),
            Self::ConfigParseError => Some("Fix syntax in .sitepulse/config.toml and retry."),
            Self::InvalidProjectId => {
                Some("Use 1-128 characters from [A-Za-z0-9-_.:] for project ids.")
            }
            Self::MissingIdentity => {
                Some("Set --agent, SITEPULSE_AGENT, or AGENT environment variable.")
            }
            Self::InvalidIdentity => Some("Use 1-64 printable characters without whitespace."),
            Self::TaskReadFailed | Self::CostReadFailed => {
                Some("Check that the store is reachable and retry; no metrics were computed.")
            }
            Self::SnapshotWriteFailed => Some("Check disk space and write permissions."),
            Self::SnapshotReadFailed => Some("Check that the store is reachable and retry."),
            Self::InvalidSnapshot => {
                Some("Submit finite numbers; scores must lie between 0 and 100.")
            }
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors surfaced by the health engine entry points.
///
/// Arithmetic edge cases are never errors; they resolve to documented
/// fallback values inside the calculator.
#[derive(Debug, thiserror::Error)]
pub enum HealthError {
    /// Malformed project identifier. Nothing was read.
    #[error("invalid project id {raw:?}: {reason}")]
    InvalidProjectId { raw: String, reason: &'static str },

    /// No caller identity was presented.
    #[error("caller identity required")]
    MissingIdentity,

    /// A caller identity was presented but failed validation.
    #[error("invalid caller identity {raw:?}: {reason}")]
    InvalidIdentity { raw: String, reason: &'static str },

    /// The task store could not be read; no metrics were produced.
    #[error("task read failed: {0}")]
    TaskRead(#[source] RepositoryError),

    /// The cost ledger could not be read; no metrics were produced.
    #[error("cost ledger read failed: {0}")]
    CostRead(#[source] RepositoryError),

    /// A snapshot write failed on a path where the write is the result.
    #[error("snapshot write failed: {0}")]
    SnapshotWrite(#[source] RepositoryError),

    /// Stored history could not be read.
    #[error("snapshot read failed: {0}")]
    SnapshotRead(#[source] RepositoryError),

    /// A caller-supplied snapshot failed validation.
    #[error("invalid snapshot field `{field}`: {reason}")]
    InvalidSnapshot { field: &'static str, reason: String },
}

impl HealthError {
    /// Machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidProjectId { .. } => ErrorCode::InvalidProjectId,
            Self::MissingIdentity => ErrorCode::MissingIdentity,
            Self::InvalidIdentity { .. } => ErrorCode::InvalidIdentity,
            Self::TaskRead(_) => ErrorCode::TaskReadFailed,
            Self::CostRead(_) => ErrorCode::CostReadFailed,
            Self::SnapshotWrite(_) => ErrorCode::SnapshotWriteFailed,
            Self::SnapshotRead(_) => ErrorCode::SnapshotReadFailed,
            Self::InvalidSnapshot { .. } => ErrorCode::InvalidSnapshot,
        }
    }

    /// `true` for validation and identity failures, which are raised before
    /// any collaborator is touched.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidProjectId { .. }
                | Self::MissingIdentity
                | Self::InvalidIdentity { .. }
                | Self::InvalidSnapshot { .. }
        )
    }
}
