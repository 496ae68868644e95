//! Session token lifecycle.
//!
//! - [`TokenRecordStore`]: the authoritative record of one session
//! - [`RefreshExecutor`]: one refresh exchange against the provider
//! - [`SessionProjector`]: coalesced refresh and the projected session
//! - [`SessionRegistry`]: sessions keyed by id, with optional persistence

mod executor;
mod projector;
mod registry;
mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use executor::{DEFAULT_REFRESH_TIMEOUT, RefreshExecutor};
pub use projector::{DEFAULT_SKEW_SECONDS, RefreshPolicy, SessionProjector};
pub use registry::SessionRegistry;
pub use store::{RecordGuard, RecordSnapshot, TokenRecordStore, storage_key};

/// Shortened token for log output. Never log a full token.
#[must_use]
pub fn token_preview(token: &str) -> String {
    let preview: String = token.chars().take(8).collect();
    format!("{preview}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_preview() {
        assert_eq!(token_preview("abcdefghijklmnop"), "abcdefgh...");
        assert_eq!(token_preview("abc"), "abc...");
    }
}
