use super::SecurityScope;
use crate::error::AccessError;
use std::path::{Path, PathBuf};

/// Guard over an active security-scoped grant on one directory.
///
/// Released exactly once: by [`ScopedAccess::release`] or on drop.
pub struct ScopedAccess {
    directory: PathBuf,
    scope: Box<dyn SecurityScope>,
    active: bool,
}

impl ScopedAccess {
    /// Start accessing `directory`. Fails if the OS refuses the grant.
    pub fn begin(directory: PathBuf, mut scope: Box<dyn SecurityScope>) -> Result<Self, AccessError> {
        if !scope.start() {
            return Err(AccessError::access_failed(format!(
                "could not start security-scoped access to '{}'",
                directory.display()
            )));
        }
        tracing::debug!("Started security-scoped access to {}", directory.display());
        Ok(Self {
            directory,
            scope,
            active: true,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// End the grant. Calling this again is a no-op.
    pub fn release(&mut self) {
        if self.active {
            self.scope.stop();
            self.active = false;
            tracing::debug!("Stopped security-scoped access to {}", self.directory.display());
        }
    }
}

impl Drop for ScopedAccess {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for ScopedAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedAccess")
            .field("directory", &self.directory)
            .field("active", &self.active)
            .finish()
    }
}
