//! Durable key-value storage seam
//!
//! Exactly two keys cross this boundary in practice: the session token and
//! the last-known permission-codes snapshot. The filesystem handler maps
//! each key to one file under a base directory; the in-memory handler backs
//! tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::fs;
use wared_core::{Result, WaredError};

/// Durable key-value persistence surviving process restarts
#[async_trait]
pub trait DurableStorage: Send + Sync {
    /// Store a value under a key, replacing any previous value
    async fn store(&self, key: &str, value: String) -> Result<()>;

    /// Load the value stored under a key, if any
    async fn load(&self, key: &str) -> Result<Option<String>>;

    /// Remove the value stored under a key; absent keys are not an error
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Filesystem-backed storage, one file per key
#[derive(Debug, Clone)]
pub struct FsDurableStorage {
    base_dir: PathBuf,
}

impl FsDurableStorage {
    /// Create a handler rooted at the given directory
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) {
            return Err(WaredError::invalid(format!("bad storage key: {key:?}")));
        }
        Ok(self.base_dir.join(format!("{key}.dat")))
    }
}

#[async_trait]
impl DurableStorage for FsDurableStorage {
    async fn store(&self, key: &str, value: String) -> Result<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.base_dir)
            .await
            .map_err(|e| WaredError::storage(format!("failed to create storage dir: {e}")))?;
        fs::write(&path, value)
            .await
            .map_err(|e| WaredError::storage(format!("failed to write {key}: {e}")))
    }

    async fn load(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(WaredError::storage(format!("failed to read {key}: {e}"))),
        }
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(WaredError::storage(format!("failed to remove {key}: {e}"))),
        }
    }
}

/// In-memory storage for tests
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with entries
    pub fn seeded(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            entries: Mutex::new(entries.into_iter().collect()),
        }
    }
}

#[async_trait]
impl DurableStorage for MemoryStorage {
    async fn store(&self, key: &str, value: String) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value);
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}
