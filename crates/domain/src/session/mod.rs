//! Session token lifecycle types

mod expiry;
mod failure;
mod projection;
mod token;

pub use expiry::{ExpiryStatus, evaluate};
pub use failure::{RefreshFailure, SessionErrorKind};
pub use projection::{ProjectedSession, SessionState};
pub use token::{DEFAULT_EXPIRES_IN_SECS, TokenGrant, TokenRecord};
