//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the session core and external systems:
//! the identity provider, the session storage mechanism and the time source.
//! Each port is a trait implemented by adapters in the infrastructure layer.

mod clock;
mod session_storage;
mod token_exchanger;

pub use clock::Clock;
pub use session_storage::{SessionStorage, StorageError};
pub use token_exchanger::TokenExchanger;
