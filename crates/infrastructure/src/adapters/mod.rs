//! Adapters for application ports that are not storage or identity.

mod system_clock;

pub use system_clock::SystemClock;
