//! # Broker Configuration
//!
//! `BrokerConfig` holds everything the broker needs besides its capabilities:
//! the picker hint, the library base name, the environment variable to
//! publish, and where the bookmark lives. Every field defaults to the fixed
//! values in [`crate::constants`], so an empty file is a valid configuration.
//!
//! ## Loading
//!
//! - `load_from_file` reads one TOML file.
//! - `load` picks the explicit `--config` path if given, else
//!   `<config_dir>/config.toml` when it exists, else defaults, and finally
//!   applies the `PYLIB_ACCESS_SUGGESTED_DIR` override.

use crate::constants::{
    BOOKMARK_STORE_KEY, CONFIG_FILE_NAME, DEFAULT_SUGGESTED_DIRECTORY, PICKER_MESSAGE,
    PROJECT_APPLICATION, PROJECT_ORGANIZATION, PROJECT_QUALIFIER, PYTHON_LIBRARY_BASE_NAME,
    PYTHON_LIBRARY_ENV_VAR, SUGGESTED_DIR_ENV_VAR,
};
use crate::error::ConfigError;
use crate::library_path::LibraryFile;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrokerConfig {
    /// Directory the picker opens at. Only validated when the picker is needed.
    pub suggested_directory: String,
    pub library_base_name: String,
    pub environment_variable: String,
    pub bookmark_key: String,
    /// Store bookmarks in this JSON file instead of the platform default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bookmark_file: Option<PathBuf>,
    pub picker_message: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            suggested_directory: DEFAULT_SUGGESTED_DIRECTORY.to_string(),
            library_base_name: PYTHON_LIBRARY_BASE_NAME.to_string(),
            environment_variable: PYTHON_LIBRARY_ENV_VAR.to_string(),
            bookmark_key: BOOKMARK_STORE_KEY.to_string(),
            bookmark_file: None,
            picker_message: PICKER_MESSAGE.to_string(),
        }
    }
}

impl BrokerConfig {
    /// Defaults with a different picker hint.
    pub fn with_suggested_directory(suggested_directory: impl Into<String>) -> Self {
        Self {
            suggested_directory: suggested_directory.into(),
            ..Self::default()
        }
    }

    pub fn library_file(&self) -> LibraryFile {
        LibraryFile::for_current_os(self.library_base_name.clone())
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `<config_dir>/config.toml`, if a config directory exists for this user.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from(PROJECT_QUALIFIER, PROJECT_ORGANIZATION, PROJECT_APPLICATION)
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::load_from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.is_file() => {
                    tracing::debug!("Loading configuration from {}", path.display());
                    Self::load_from_file(&path)?
                }
                _ => Self::default(),
            },
        };

        if let Ok(suggested) = std::env::var(SUGGESTED_DIR_ENV_VAR) {
            tracing::debug!("{} overrides suggested directory", SUGGESTED_DIR_ENV_VAR);
            config.suggested_directory = suggested;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let config = BrokerConfig::default();
        assert_eq!(config.suggested_directory, "/usr/local/bin/python3/lib");
        assert_eq!(config.environment_variable, "PYTHON_LIBRARY");
        assert_eq!(config.bookmark_key, "PYTHON_LIB_DIR");
        assert_eq!(config.library_base_name, "libpython3.10");
        assert!(config.bookmark_file.is_none());
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config: BrokerConfig = toml::from_str("").unwrap();
        assert_eq!(config, BrokerConfig::default());
    }

    #[test]
    fn test_with_suggested_directory_keeps_other_defaults() {
        let config = BrokerConfig::with_suggested_directory("/opt/python/lib");
        assert_eq!(config.suggested_directory, "/opt/python/lib");
        assert_eq!(config.bookmark_key, BOOKMARK_STORE_KEY);
    }
}
