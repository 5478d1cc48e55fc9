//! # Platform Capabilities
//!
//! Everything that needs the host OS sits behind the [`Platform`] trait:
//! showing the directory picker, turning a granted directory into a
//! security-scoped bookmark, and resolving that bookmark on later runs.
//!
//! ## Platform Support
//!
//! - **macOS**: `NSOpenPanel` via `rfd` and CoreFoundation security-scoped bookmarks.
//! - **Other**: no backend; [`native_platform`] returns `AccessError::UnsupportedOs`.
//!
//! The backend is chosen with `cfg` at compile time. Tests substitute the
//! scripted fake in [`crate::test_utils`].

#[cfg(target_os = "macos")]
pub(crate) mod core_foundation;
#[cfg(target_os = "macos")]
mod macos;
mod scoped;
#[cfg(not(target_os = "macos"))]
mod unsupported;

#[cfg(target_os = "macos")]
pub use macos::{MacPlatform, native_platform};
pub use scoped::ScopedAccess;
#[cfg(not(target_os = "macos"))]
pub use unsupported::native_platform;

use crate::error::AccessError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Opaque, platform-defined bookmark bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct Bookmark(Vec<u8>);

impl Bookmark {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for Bookmark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Bookmark({} bytes)", self.0.len())
    }
}

/// Begin/end pair of an OS-level scoped access grant.
///
/// `ScopedAccess` guarantees `stop` runs at most once and only after a
/// successful `start`.
pub trait SecurityScope: Send {
    /// Start accessing the resource. Returns false if the OS refused.
    fn start(&mut self) -> bool;

    fn stop(&mut self);
}

/// Result of resolving a stored bookmark.
pub struct ResolvedBookmark {
    pub directory: PathBuf,
    pub is_stale: bool,
    pub scope: Box<dyn SecurityScope>,
}

impl std::fmt::Debug for ResolvedBookmark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedBookmark")
            .field("directory", &self.directory)
            .field("is_stale", &self.is_stale)
            .finish_non_exhaustive()
    }
}

/// Configuration of the modal directory chooser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerRequest {
    pub message: String,
    pub initial_directory: PathBuf,
    pub allowed_extensions: Vec<String>,
    pub can_choose_files: bool,
    pub can_choose_directories: bool,
    pub can_create_directories: bool,
    pub allows_multiple_selection: bool,
    pub shows_hidden_files: bool,
}

impl PickerRequest {
    /// A directory-only, single-selection picker.
    pub fn directory(
        message: impl Into<String>,
        initial_directory: impl Into<PathBuf>,
        library_extension: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            initial_directory: initial_directory.into(),
            allowed_extensions: vec![library_extension.into()],
            can_choose_files: false,
            can_choose_directories: true,
            can_create_directories: false,
            allows_multiple_selection: false,
            shows_hidden_files: false,
        }
    }
}

/// OS integration used by the broker.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Show the directory picker. `Ok(None)` means the user cancelled.
    ///
    /// This is the only suspension point of a request.
    async fn select_directory(&self, request: &PickerRequest)
    -> Result<Option<PathBuf>, AccessError>;

    /// Create a security-scoped bookmark for a directory the user just granted.
    fn create_bookmark(&self, directory: &Path) -> Result<Bookmark, AccessError>;

    /// Resolve a stored bookmark, reporting whether it went stale.
    fn resolve_bookmark(&self, bookmark: &Bookmark) -> Result<ResolvedBookmark, AccessError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_picker_request_flags() {
        let request = PickerRequest::directory("pick", "/opt/python/lib", "dylib");
        assert!(request.can_choose_directories);
        assert!(!request.can_choose_files);
        assert!(!request.can_create_directories);
        assert!(!request.allows_multiple_selection);
        assert!(!request.shows_hidden_files);
        assert_eq!(request.allowed_extensions, vec!["dylib".to_string()]);
    }

    #[test]
    fn test_bookmark_debug_hides_bytes() {
        let bookmark = Bookmark::new(vec![1, 2, 3]);
        assert_eq!(format!("{bookmark:?}"), "Bookmark(3 bytes)");
    }
}
