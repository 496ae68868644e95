//! Refresh failure taxonomy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of the last refresh failure, as exposed to callers.
///
/// Stored on the token record and surfaced as `error` in the projected
/// session. Downstream callers must treat its presence as "credential may
/// be stale or unusable".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionErrorKind {
    /// The session has no refresh token to present.
    NoRefreshToken,
    /// The identity provider rejected the refresh token. Terminal.
    InvalidGrant,
    /// The identity provider was unreachable or unavailable.
    Transient,
    /// Unclassified failure, retried like [`Self::Transient`].
    Unknown,
}

impl SessionErrorKind {
    /// Returns true if no further refresh attempt is meaningful.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::InvalidGrant)
    }

    /// Stable name used in logs and headers.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoRefreshToken => "NoRefreshToken",
            Self::InvalidGrant => "InvalidGrant",
            Self::Transient => "Transient",
            Self::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for SessionErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a failed refresh exchange.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshFailure {
    /// Refresh was requested for a record without a refresh token.
    #[error("no refresh token available")]
    NoRefreshToken,

    /// The provider rejected or expired the refresh token.
    #[error("refresh token rejected: {message}")]
    InvalidGrant {
        /// Provider error description.
        message: String,
    },

    /// Network failure, timeout or provider unavailability.
    #[error("identity provider unavailable: {message}")]
    Transient {
        /// Error description.
        message: String,
    },

    /// Anything that could not be classified.
    #[error("refresh failed: {message}")]
    Unknown {
        /// Error description.
        message: String,
    },
}

impl RefreshFailure {
    /// Creates an [`Self::InvalidGrant`] failure.
    pub fn invalid_grant(message: impl Into<String>) -> Self {
        Self::InvalidGrant {
            message: message.into(),
        }
    }

    /// Creates a [`Self::Transient`] failure.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    /// Creates an [`Self::Unknown`] failure.
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            message: message.into(),
        }
    }

    /// The classification recorded on the token record.
    #[must_use]
    pub const fn kind(&self) -> SessionErrorKind {
        match self {
            Self::NoRefreshToken => SessionErrorKind::NoRefreshToken,
            Self::InvalidGrant { .. } => SessionErrorKind::InvalidGrant,
            Self::Transient { .. } => SessionErrorKind::Transient,
            Self::Unknown { .. } => SessionErrorKind::Unknown,
        }
    }

    /// Returns true if a later attempt may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. } | Self::Unknown { .. })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            RefreshFailure::NoRefreshToken.kind(),
            SessionErrorKind::NoRefreshToken
        );
        assert_eq!(
            RefreshFailure::invalid_grant("revoked").kind(),
            SessionErrorKind::InvalidGrant
        );
        assert_eq!(
            RefreshFailure::transient("timeout").kind(),
            SessionErrorKind::Transient
        );
        assert_eq!(
            RefreshFailure::unknown("teapot").kind(),
            SessionErrorKind::Unknown
        );
    }

    #[test]
    fn test_only_transient_and_unknown_are_retryable() {
        assert!(RefreshFailure::transient("x").is_retryable());
        assert!(RefreshFailure::unknown("x").is_retryable());
        assert!(!RefreshFailure::invalid_grant("x").is_retryable());
        assert!(!RefreshFailure::NoRefreshToken.is_retryable());
    }

    #[test]
    fn test_only_invalid_grant_is_terminal() {
        assert!(SessionErrorKind::InvalidGrant.is_terminal());
        assert!(!SessionErrorKind::Transient.is_terminal());
        assert!(!SessionErrorKind::Unknown.is_terminal());
        assert!(!SessionErrorKind::NoRefreshToken.is_terminal());
    }

    #[test]
    fn test_error_kind_serializes_by_name() {
        let json = serde_json::to_string(&SessionErrorKind::InvalidGrant).unwrap();
        assert_eq!(json, "\"InvalidGrant\"");
        assert_eq!(SessionErrorKind::Transient.to_string(), "Transient");
    }
}
