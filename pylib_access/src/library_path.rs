//! Library file naming, suggested-location validation and post-publish checks.

use crate::constants::{PLATFORM_LIBRARY_EXTENSION, PYTHON_LIBRARY_BASE_NAME, QUARANTINE_XATTR};
use crate::error::AccessError;
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// Name of the shared library inside the granted directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryFile {
    pub base_name: String,
    pub extension: String,
}

impl LibraryFile {
    /// Library file with the given base name and this platform's extension.
    pub fn for_current_os(base_name: impl Into<String>) -> Self {
        Self {
            base_name: base_name.into(),
            extension: PLATFORM_LIBRARY_EXTENSION.to_string(),
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.{}", self.base_name, self.extension)
    }
}

impl Default for LibraryFile {
    fn default() -> Self {
        Self::for_current_os(PYTHON_LIBRARY_BASE_NAME)
    }
}

/// Absolute path to the shared library inside a granted directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLibraryPath {
    directory: PathBuf,
    path: PathBuf,
}

impl ResolvedLibraryPath {
    pub fn compose(directory: &Path, library: &LibraryFile) -> Self {
        Self {
            directory: directory.to_path_buf(),
            path: directory.join(library.file_name()),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn as_path(&self) -> &Path {
        &self.path
    }

    /// The path as the string published to the environment.
    pub fn to_env_value(&self) -> Result<&str, AccessError> {
        self.path.to_str().ok_or_else(|| {
            AccessError::access_failed(format!(
                "library path '{}' is not valid UTF-8",
                self.path.display()
            ))
        })
    }
}

impl fmt::Display for ResolvedLibraryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Parse the picker hint into an absolute directory.
///
/// Accepts a plain absolute path or a `file://` URL.
pub fn parse_suggested_location(location: &str) -> Result<PathBuf, AccessError> {
    let invalid = || AccessError::InvalidSuggestedLocation {
        location: location.to_string(),
    };

    let trimmed = location.trim();
    if trimmed.is_empty() || trimmed.contains('\0') {
        return Err(invalid());
    }

    let url = if trimmed.starts_with("file:") {
        Url::parse(trimmed).map_err(|_| invalid())?
    } else {
        Url::from_directory_path(trimmed).map_err(|_| invalid())?
    };

    url.to_file_path().map_err(|_| invalid())
}

/// What was found at the published library path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibraryInspection {
    pub exists: bool,
    pub quarantined: bool,
}

/// Check the library file and log anything that will stop the loader.
pub fn inspect_library(library: &ResolvedLibraryPath) -> LibraryInspection {
    let path = library.as_path();
    let exists = path.is_file();
    let quarantined = exists && is_quarantined(path);

    if !exists {
        tracing::warn!(
            "Python library not found at {} - the loader will fail until it is installed there",
            path.display()
        );
    } else if quarantined {
        tracing::warn!(
            "Python library {} is quarantined and may fail to load. Remove with: xattr -d {} {}",
            path.display(),
            QUARANTINE_XATTR,
            path.display()
        );
    }

    LibraryInspection {
        exists,
        quarantined,
    }
}

#[cfg(target_os = "macos")]
fn is_quarantined(path: &Path) -> bool {
    use std::process::Command;
    match Command::new("xattr")
        .arg("-p")
        .arg(QUARANTINE_XATTR)
        .arg(path)
        .output()
    {
        Ok(output) => output.status.success(),
        Err(e) => {
            tracing::debug!("xattr check failed for {}: {}", path.display(), e);
            false
        }
    }
}

#[cfg(not(target_os = "macos"))]
fn is_quarantined(_path: &Path) -> bool {
    false
}
