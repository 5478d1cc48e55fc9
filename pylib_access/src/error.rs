//! Errors surfaced by the access broker and its capabilities.

use std::path::PathBuf;

/// Failures of a library access request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("Suggested Python library location '{location}' is not a valid absolute directory")]
    InvalidSuggestedLocation { location: String },

    #[error("No Python library directory was selected")]
    NoPathSelected,

    #[error("Python library access failed: {reason}")]
    LibraryAccessFailed { reason: String },

    #[error("Unsupported operating system: {0}")]
    UnsupportedOs(String),
}

impl AccessError {
    pub fn access_failed(reason: impl std::fmt::Display) -> Self {
        AccessError::LibraryAccessFailed {
            reason: reason.to_string(),
        }
    }
}

/// Failures of the durable bookmark store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to access bookmark store '{path:?}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Bookmark store '{path:?}' is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Preferences store rejected '{key}': {reason}")]
    Preferences { key: String, reason: String },

    #[error("Could not determine a configuration directory for the bookmark store")]
    NoConfigDirectory,
}

impl From<StoreError> for AccessError {
    fn from(error: StoreError) -> Self {
        AccessError::access_failed(error)
    }
}

/// Failures loading the broker configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path:?}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path:?}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
