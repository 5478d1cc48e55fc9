//! # Durable Bookmark Storage
//!
//! A single key-value capability holding the opaque bookmark bytes.
//!
//! - **`PreferencesStore`** (macOS): the application's preference domain,
//!   the same place `NSUserDefaults.standard` writes.
//! - **`FileStore`**: a JSON file in the user configuration directory, used
//!   on other platforms or when `bookmark_file` is configured.
//! - **`MemoryStore`**: process-local, for tests and embedding.

mod file;
#[cfg(target_os = "macos")]
mod preferences;

pub use file::{FileStore, StoredBookmark};
#[cfg(target_os = "macos")]
pub use preferences::PreferencesStore;

use crate::config::BrokerConfig;
use crate::error::StoreError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Durable key-value storage for bookmark bytes. Last write wins.
pub trait BookmarkStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Replace any existing value under `key`.
    fn save(&self, key: &str, bookmark: &[u8]) -> Result<(), StoreError>;

    /// Remove the value. Returns whether one existed.
    fn remove(&self, key: &str) -> Result<bool, StoreError>;
}

/// In-memory store.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BookmarkStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries().get(key).cloned())
    }

    fn save(&self, key: &str, bookmark: &[u8]) -> Result<(), StoreError> {
        self.entries().insert(key.to_string(), bookmark.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.entries().remove(key).is_some())
    }
}

/// The store selected by configuration and platform.
///
/// An explicit `bookmark_file` always wins. Otherwise macOS uses the
/// preference domain and other platforms the default JSON file.
pub fn native_store(config: &BrokerConfig) -> Result<Arc<dyn BookmarkStore>, StoreError> {
    if let Some(path) = &config.bookmark_file {
        return Ok(Arc::new(FileStore::new(path.clone())));
    }

    #[cfg(target_os = "macos")]
    {
        Ok(Arc::new(PreferencesStore::new()))
    }

    #[cfg(not(target_os = "macos"))]
    {
        Ok(Arc::new(FileStore::in_config_dir()?))
    }
}
