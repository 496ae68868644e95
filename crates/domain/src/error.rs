//! Domain error types

use thiserror::Error;

/// Domain-level errors that can occur during validation or processing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An identifier is invalid or empty.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// A token record violates its invariants.
    #[error("invalid token record: {0}")]
    InvalidTokenRecord(String),
}

/// Result type alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
