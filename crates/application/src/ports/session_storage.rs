//! Session storage port
//!
//! The token record is persisted through an opaque key-value accessor
//! (get/set by name). Whether that is a cookie jar, a file or a cache is
//! the adapter's business.

use async_trait::async_trait;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The backing store rejected the operation.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

/// Key-value accessor scoped to session data.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Reads a value by name.
    ///
    /// # Returns
    /// `None` if nothing is stored under `name`.
    async fn get(&self, name: &str) -> Result<Option<String>, StorageError>;

    /// Stores a value under `name`, replacing any previous value.
    ///
    /// # Errors
    /// Returns an error if the value cannot be written.
    async fn set(&self, name: &str, value: String) -> Result<(), StorageError>;

    /// Removes the value stored under `name`.
    ///
    /// # Returns
    /// Whether a value was present.
    async fn remove(&self, name: &str) -> Result<bool, StorageError>;
}
