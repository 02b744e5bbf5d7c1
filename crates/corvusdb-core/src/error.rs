//! Error types for `CorvusDB`.
//!
//! This module provides a unified error type for all `CorvusDB` operations.
//! Error codes follow the pattern `CORVUS-XXX` for easy debugging.

use thiserror::Error;

/// Result type alias for `CorvusDB` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in `CorvusDB` operations.
///
/// Each variant includes a descriptive error message suitable for end-users.
#[derive(Error, Debug)]
pub enum Error {
    /// Entity not found (CORVUS-001).
    #[error("[CORVUS-001] Not found: {0}")]
    NotFound(String),

    /// Entity or schema entry already exists (CORVUS-002).
    #[error("[CORVUS-002] Already exists: {0}")]
    AlreadyExists(String),

    /// Invalid argument (CORVUS-003).
    #[error("[CORVUS-003] Invalid argument: {0}")]
    InvalidArgument(String),

    /// Value kind does not match the declared column type (CORVUS-004).
    #[error("[CORVUS-004] Schema mismatch for property '{property}': expected {expected}, got {actual}")]
    SchemaMismatch {
        /// Property name.
        property: String,
        /// Declared column type name.
        expected: String,
        /// Supplied value kind.
        actual: String,
    },

    /// JSON value recognizable but not convertible to the declared type (CORVUS-005).
    ///
    /// The column is tombstoned at the failing position.
    #[error("[CORVUS-005] Property coercion failed for '{0}'")]
    PropertyCoercionFailed(String),

    /// Operation observed a cancellation (CORVUS-006).
    #[error("[CORVUS-006] Operation cancelled")]
    Cancelled,

    /// An id allocation would exceed the encoded width (CORVUS-007).
    #[error("[CORVUS-007] Id overflow: {0}")]
    Overflow(String),

    /// Configuration error (CORVUS-008).
    #[error("[CORVUS-008] Configuration error: {0}")]
    Config(String),

    /// A shard mailbox is gone; the engine is shutting down (CORVUS-009).
    #[error("[CORVUS-009] Shard unavailable: {0}")]
    ShardUnavailable(String),

    /// IO error (CORVUS-010).
    #[error("[CORVUS-010] IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns the error code (e.g., "CORVUS-001").
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "CORVUS-001",
            Self::AlreadyExists(_) => "CORVUS-002",
            Self::InvalidArgument(_) => "CORVUS-003",
            Self::SchemaMismatch { .. } => "CORVUS-004",
            Self::PropertyCoercionFailed(_) => "CORVUS-005",
            Self::Cancelled => "CORVUS-006",
            Self::Overflow(_) => "CORVUS-007",
            Self::Config(_) => "CORVUS-008",
            Self::ShardUnavailable(_) => "CORVUS-009",
            Self::Io(_) => "CORVUS-010",
        }
    }

    /// Returns true if this error is recoverable.
    ///
    /// Non-recoverable errors indicate the engine is going away.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::ShardUnavailable(_) | Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(Error::NotFound("x".into()).code(), "CORVUS-001");
        assert_eq!(Error::Overflow("x".into()).code(), "CORVUS-007");
        assert_eq!(Error::Cancelled.code(), "CORVUS-006");
    }

    #[test]
    fn test_recoverability() {
        assert!(Error::NotFound("x".into()).is_recoverable());
        assert!(!Error::Cancelled.is_recoverable());
        assert!(!Error::ShardUnavailable("0".into()).is_recoverable());
    }

    #[test]
    fn test_display_carries_code_prefix() {
        let message = Error::AlreadyExists("Node(User, helene)".into()).to_string();
        assert!(message.starts_with("[CORVUS-002]"));
        assert!(message.contains("helene"));
    }
}
