//! Waybill Domain - Session token types
//!
//! This crate defines the domain model for the session token lifecycle:
//! the token record, expiry evaluation, refresh failure classification
//! and the session projection handed to downstream callers.
//! All types here are pure Rust with no I/O dependencies.

pub mod error;
pub mod id;
pub mod session;

pub use error::{DomainError, DomainResult};
pub use id::{OrgId, SessionId, generate_id};
pub use session::{
    DEFAULT_EXPIRES_IN_SECS, ExpiryStatus, ProjectedSession, RefreshFailure, SessionErrorKind,
    SessionState, TokenGrant, TokenRecord, evaluate,
};
