//! Waybill Application - Session token orchestration
//!
//! This crate holds the ports the session lifecycle depends on and the
//! orchestration around them: the per-session token record store, the
//! refresh executor, the session projector and the registry that keys
//! sessions by id.

pub mod error;
pub mod ports;
pub mod session;

pub use error::{ApplicationError, ApplicationResult};
pub use session::{
    RefreshExecutor, RefreshPolicy, SessionProjector, SessionRegistry, TokenRecordStore,
};
