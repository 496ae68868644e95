//! Process-local session storage.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use waybill_application::ports::{SessionStorage, StorageError};

/// Session storage held in memory; contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemorySessionStorage {
    /// Creates an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStorage for MemorySessionStorage {
    async fn get(&self, name: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().await.get(name).cloned())
    }

    async fn set(&self, name: &str, value: String) -> Result<(), StorageError> {
        self.entries.write().await.insert(name.to_string(), value);
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.entries.write().await.remove(name).is_some())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_set_get_remove() {
        let storage = MemorySessionStorage::new();
        assert_eq!(storage.get("session:a").await.unwrap(), None);

        storage.set("session:a", "one".to_string()).await.unwrap();
        storage.set("session:a", "two".to_string()).await.unwrap();
        assert_eq!(
            storage.get("session:a").await.unwrap().as_deref(),
            Some("two")
        );

        assert!(storage.remove("session:a").await.unwrap());
        assert!(!storage.remove("session:a").await.unwrap());
    }
}
