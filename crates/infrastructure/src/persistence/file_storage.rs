//! File-backed session storage.
//!
//! One JSON file per name under a directory. Names are percent-encoded so
//! that `session:<id>` and arbitrary ids map to safe file names.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use url::form_urlencoded::byte_serialize;
use waybill_application::ports::{SessionStorage, StorageError};

/// Session storage persisting each entry as `<directory>/<name>.json`.
#[derive(Debug, Clone)]
pub struct FileSessionStorage {
    directory: PathBuf,
}

impl FileSessionStorage {
    /// Creates a storage rooted at `directory`; it is created on first write.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// The directory entries are stored in.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path_for(&self, name: &str) -> PathBuf {
        let encoded: String = byte_serialize(name.as_bytes()).collect();
        self.directory.join(format!("{encoded}.json"))
    }
}

#[async_trait]
impl SessionStorage for FileSessionStorage {
    async fn get(&self, name: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(name)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn set(&self, name: &str, value: String) -> Result<(), StorageError> {
        fs::create_dir_all(&self.directory).await?;
        let path = self.path_for(name);
        // Write then rename so readers never see a partial record.
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, value).await?;
        fs::rename(&staging, &path).await?;
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<bool, StorageError> {
        match fs::remove_file(self.path_for(name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}
