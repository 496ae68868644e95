//! Waybill Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports
//! defined in the application layer: the `OAuth2` token endpoint
//! exchanger, the system clock, session storage backends, settings
//! loading and bearer attachment for downstream requests.

pub mod adapters;
pub mod auth;
pub mod config;
pub mod http;
pub mod persistence;

pub use adapters::SystemClock;
pub use auth::{ClientAuth, OAuth2TokenExchanger, TokenResponseFields};
pub use config::{ConfigError, SessionSettings, StorageKind};
pub use http::{BearerAuth, DownstreamAuthError};
pub use persistence::{FileSessionStorage, MemorySessionStorage};
