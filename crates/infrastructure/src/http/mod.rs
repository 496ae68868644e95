//! HTTP infrastructure utilities.
//!
//! This module provides:
//! - Bearer credential attachment for downstream requests

mod bearer;

pub use bearer::{BearerAuth, DownstreamAuthError};
