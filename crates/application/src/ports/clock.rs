//! Clock port for expiry decisions

use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Port for getting the current time.
///
/// Expiry evaluation and token anchoring read time only through this
/// trait so tests can drive the clock.
pub trait Clock: Send + Sync {
    /// Returns the current UTC timestamp.
    fn now(&self) -> DateTime<Utc>;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}
