//! Application error types

use thiserror::Error;
use waybill_domain::DomainError;

use crate::ports::StorageError;

/// Application-level errors.
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// A domain validation error occurred.
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    /// A session storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The requested session was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),

    /// The operation timed out.
    #[error("operation timed out")]
    Timeout,
}

/// Result type alias for application operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
