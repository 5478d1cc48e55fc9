use super::BookmarkStore;
use crate::constants::{
    BOOKMARK_FILE_NAME, PROJECT_APPLICATION, PROJECT_ORGANIZATION, PROJECT_QUALIFIER,
};
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// One stored bookmark with the time it was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredBookmark {
    pub bookmark: Vec<u8>,
    pub updated_at: DateTime<Utc>,
}

type Entries = BTreeMap<String, StoredBookmark>;

/// JSON file store. Every write replaces the whole file atomically.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<config_dir>/bookmarks.json`.
    pub fn in_config_dir() -> Result<Self, StoreError> {
        let dirs = ProjectDirs::from(PROJECT_QUALIFIER, PROJECT_ORGANIZATION, PROJECT_APPLICATION)
            .ok_or(StoreError::NoConfigDirectory)?;
        Ok(Self::new(dirs.config_dir().join(BOOKMARK_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The full entry, including its write time.
    pub fn entry(&self, key: &str) -> Result<Option<StoredBookmark>, StoreError> {
        Ok(self.read_entries()?.remove(key))
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn read_entries(&self) -> Result<Entries, StoreError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Entries::new()),
            Err(e) => return Err(self.io_error(e)),
        };
        if contents.trim().is_empty() {
            return Ok(Entries::new());
        }
        serde_json::from_str(&contents).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn write_entries(&self, entries: &Entries) -> Result<(), StoreError> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(|e| self.io_error(e))?;

        let json = serde_json::to_vec_pretty(entries).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        let mut temp = tempfile::NamedTempFile::new_in(&parent).map_err(|e| self.io_error(e))?;
        temp.write_all(&json).map_err(|e| self.io_error(e))?;
        temp.as_file().sync_all().map_err(|e| self.io_error(e))?;
        temp.persist(&self.path).map_err(|e| self.io_error(e.error))?;
        Ok(())
    }
}

impl BookmarkStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entry(key)?.map(|entry| entry.bookmark))
    }

    fn save(&self, key: &str, bookmark: &[u8]) -> Result<(), StoreError> {
        let mut entries = self.read_entries()?;
        entries.insert(
            key.to_string(),
            StoredBookmark {
                bookmark: bookmark.to_vec(),
                updated_at: Utc::now(),
            },
        );
        self.write_entries(&entries)?;
        tracing::debug!("Saved bookmark '{}' to {}", key, self.path.display());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let mut entries = self.read_entries()?;
        if entries.remove(key).is_none() {
            return Ok(false);
        }
        self.write_entries(&entries)?;
        Ok(true)
    }
}
