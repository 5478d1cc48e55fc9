use super::core_foundation::{self, CfOwned};
use super::{Bookmark, PickerRequest, Platform, ResolvedBookmark, SecurityScope};
use crate::error::AccessError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// `NSOpenPanel` plus CoreFoundation security-scoped bookmarks.
///
/// The panel needs the main thread to be free or to be the one awaiting it.
#[derive(Debug, Default, Clone, Copy)]
pub struct MacPlatform;

/// The macOS backend.
pub fn native_platform() -> Result<Arc<dyn Platform>, AccessError> {
    Ok(Arc::new(MacPlatform))
}

struct MacScope {
    url: CfOwned,
}

impl SecurityScope for MacScope {
    fn start(&mut self) -> bool {
        core_foundation::start_accessing(&self.url)
    }

    fn stop(&mut self) {
        core_foundation::stop_accessing(&self.url);
    }
}

#[async_trait]
impl Platform for MacPlatform {
    async fn select_directory(
        &self,
        request: &PickerRequest,
    ) -> Result<Option<PathBuf>, AccessError> {
        // rfd shows the panel on the main thread: directly when awaited there,
        // otherwise by dispatching to it and resolving once the user answers.
        let extensions: Vec<&str> = request
            .allowed_extensions
            .iter()
            .map(String::as_str)
            .collect();
        let selected = rfd::AsyncFileDialog::new()
            .set_title(request.message.as_str())
            .set_directory(&request.initial_directory)
            .add_filter("Python library", extensions.as_slice())
            .set_can_create_directories(request.can_create_directories)
            .pick_folder()
            .await
            .map(|handle| handle.path().to_path_buf());

        match &selected {
            Some(path) => tracing::info!("Selected Python library directory: {}", path.display()),
            None => tracing::info!("User cancelled the directory picker"),
        }
        Ok(selected)
    }

    fn create_bookmark(&self, directory: &Path) -> Result<Bookmark, AccessError> {
        core_foundation::create_security_scoped_bookmark(directory)
            .map(Bookmark::new)
            .map_err(|reason| {
                AccessError::access_failed(format!(
                    "could not create bookmark for '{}': {}",
                    directory.display(),
                    reason
                ))
            })
    }

    fn resolve_bookmark(&self, bookmark: &Bookmark) -> Result<ResolvedBookmark, AccessError> {
        let (url, is_stale) =
            core_foundation::resolve_security_scoped_bookmark(bookmark.as_bytes()).map_err(
                |reason| AccessError::access_failed(format!("could not resolve bookmark: {reason}")),
            )?;
        let directory = core_foundation::url_path(&url).ok_or_else(|| {
            AccessError::access_failed("resolved bookmark has no file system path")
        })?;

        Ok(ResolvedBookmark {
            directory,
            is_stale,
            scope: Box::new(MacScope { url }),
        })
    }
}
