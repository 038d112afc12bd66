//! JSON-file-backed user store.
//!
//! Loads users from a JSON array at startup and serves them from memory.
//! The file is read once; the store never writes it back.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{info, instrument, warn};

use userhub_core::error::{Result, UserhubError};
use userhub_core::traits::UserStore;
use userhub_core::types::{LookupField, UserRecord};

use crate::memory::{MemoryStore, StoreConfig};

/// File-backed user store.
///
/// # File Format
///
/// ```text
/// [
///   {"id": 1, "username": "alice", "name": "Alice", "email": "alice@example.com",
///    "created_at": "2024-01-01T00:00:00Z"},
///   ...
/// ]
/// ```
pub struct FileStore {
    /// Path to the JSON file
    path: PathBuf,
    /// In-memory storage
    memory: MemoryStore,
}

impl FileStore {
    /// Opens the store at `path`.
    ///
    /// If the file exists it is loaded; otherwise the store starts empty.
    pub async fn open(path: impl AsRef<Path>, config: StoreConfig) -> Result<Self> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
            memory: MemoryStore::with_config(config),
        };

        if fs::try_exists(&store.path).await? {
            store.load().await?;
        } else {
            warn!(path = ?store.path, "User file not found, starting with no users");
        }

        Ok(store)
    }

    #[instrument(skip(self), fields(path = ?self.path))]
    async fn load(&self) -> Result<()> {
        let contents = fs::read(&self.path).await.map_err(|e| {
            UserhubError::Io(format!("failed to read {}: {}", self.path.display(), e))
        })?;

        if contents.iter().all(u8::is_ascii_whitespace) {
            warn!("User file is empty, starting with no users");
            return Ok(());
        }

        let users: Vec<UserRecord> = serde_json::from_slice(&contents)?;
        let count = self.memory.import(users)?;
        info!(count, "Loaded users from file");
        Ok(())
    }

    /// Returns the number of users.
    pub fn len(&self) -> usize {
        self.memory.len()
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }
}

#[async_trait]
impl UserStore for FileStore {
    async fn fetch_by_id(&self, id: u64) -> Result<Option<UserRecord>> {
        self.memory.fetch_by_id(id).await
    }

    async fn fetch_by_field(&self, field: LookupField, value: &str) -> Result<Option<UserRecord>> {
        self.memory.fetch_by_field(field, value).await
    }
}
