//! # Library Access Broker
//!
//! `LibraryAccessBroker` runs the bookmark lifecycle for the Python library
//! directory:
//!
//! 1. Load the stored bookmark and resolve it. A fresh bookmark starts
//!    security-scoped access and the guard is kept until released.
//! 2. With no bookmark, or a stale one, validate the suggested location and
//!    show the directory picker. Cancelling fails with `NoPathSelected`.
//! 3. Bookmark the chosen directory and append the library file name.
//! 4. Once the path is known to be publishable, persist the new bookmark over
//!    the old one, then publish the path in the environment.
//!
//! A failed request leaves both the stored bookmark and the environment as
//! they were.
//!
//! Requests on one broker are single-flight: a second caller waits for the
//! first to finish and then normally finds the fresh bookmark it wrote.

use crate::config::BrokerConfig;
use crate::environment::{Environment, ProcessEnvironment};
use crate::error::AccessError;
use crate::library_path::{ResolvedLibraryPath, inspect_library, parse_suggested_location};
use crate::platform::{self, Bookmark, PickerRequest, Platform, ScopedAccess};
use crate::storage::{self, BookmarkStore};
use pylib_access_common::AccessStateMachine;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// What the store currently holds, as seen without prompting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookmarkStatus {
    Missing,
    Fresh { directory: PathBuf },
    Stale { directory: PathBuf },
    Unresolvable { reason: String },
}

pub struct LibraryAccessBroker {
    config: BrokerConfig,
    platform: Arc<dyn Platform>,
    store: Arc<dyn BookmarkStore>,
    environment: Arc<dyn Environment>,
    state: AccessStateMachine,
    request_lock: tokio::sync::Mutex<()>,
    access: Mutex<Option<ScopedAccess>>,
}

impl std::fmt::Debug for LibraryAccessBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryAccessBroker")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("access", &*self.access_slot())
            .finish_non_exhaustive()
    }
}

impl LibraryAccessBroker {
    pub fn new(
        config: BrokerConfig,
        platform: Arc<dyn Platform>,
        store: Arc<dyn BookmarkStore>,
        environment: Arc<dyn Environment>,
    ) -> Self {
        Self {
            config,
            platform,
            store,
            environment,
            state: AccessStateMachine::new(),
            request_lock: tokio::sync::Mutex::new(()),
            access: Mutex::new(None),
        }
    }

    /// Broker wired to this platform's picker, store and the process environment.
    ///
    /// Requests write the process environment; see [`ProcessEnvironment`] for
    /// the threading constraint this puts on the host.
    pub fn native(config: BrokerConfig) -> Result<Self, AccessError> {
        let platform = platform::native_platform()?;
        let store = storage::native_store(&config)?;
        Ok(Self::new(
            config,
            platform,
            store,
            Arc::new(ProcessEnvironment),
        ))
    }

    /// Native broker with default settings and the given picker hint.
    pub fn configure(suggested_directory: impl Into<String>) -> Result<Self, AccessError> {
        Self::native(BrokerConfig::with_suggested_directory(suggested_directory))
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// State observers can clone and await.
    pub fn state(&self) -> &AccessStateMachine {
        &self.state
    }

    /// Directory currently held under scoped access, if any.
    pub fn active_directory(&self) -> Option<PathBuf> {
        self.access_slot()
            .as_ref()
            .map(|access| access.directory().to_path_buf())
    }

    /// Obtain access to the library directory and publish the library path.
    pub async fn request_access(&self) -> Result<ResolvedLibraryPath, AccessError> {
        let _flight = self.request_lock.lock().await;
        let _ = self.state.transition_to_resolving();

        match self.run_request().await {
            Ok(library) => {
                let _ = self
                    .state
                    .transition_to_granted(library.as_path().to_path_buf());
                Ok(library)
            }
            Err(e) => {
                tracing::error!("Python setup failed, Python integration won't work: {}", e);
                let _ = self.state.transition_to_failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Run [`request_access`](Self::request_access) to completion from synchronous code.
    ///
    /// Blocks the calling thread. Inside a multi-thread Tokio runtime the
    /// request runs in place on the calling thread. Inside a current-thread
    /// runtime it runs on a scoped helper thread so that runtime is never
    /// re-entered; on macOS that case is refused on the main thread, because
    /// the picker panel would wait for the main thread while it waits for
    /// the helper. Await `request_access` there instead.
    pub fn request_access_blocking(&self) -> Result<ResolvedLibraryPath, AccessError> {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return self.block_on_request();
        };
        if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread {
            return tokio::task::block_in_place(|| handle.block_on(self.request_access()));
        }

        #[cfg(target_os = "macos")]
        if platform::core_foundation::is_main_thread() {
            return Err(AccessError::access_failed(
                "blocking request from the main thread of a current-thread runtime; \
                 await request_access instead",
            ));
        }

        std::thread::scope(|scope| match scope.spawn(|| self.block_on_request()).join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        })
    }

    fn block_on_request(&self) -> Result<ResolvedLibraryPath, AccessError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| AccessError::access_failed(format!("could not start runtime: {e}")))?;
        runtime.block_on(self.request_access())
    }

    /// End the held scoped access. Safe to call any number of times.
    pub fn release_access(&self) {
        let held = self.access_slot().take();
        if let Some(mut access) = held {
            access.release();
            let _ = self.state.transition_to_released();
            tracing::info!(
                "Released access to Python library directory {}",
                access.directory().display()
            );
        }
    }

    /// Delete the stored bookmark so the next request prompts again.
    pub fn forget_bookmark(&self) -> Result<bool, AccessError> {
        let removed = self.store.remove(&self.config.bookmark_key)?;
        if removed {
            tracing::info!("Removed stored bookmark '{}'", self.config.bookmark_key);
        }
        Ok(removed)
    }

    /// Inspect the stored bookmark without prompting or starting access.
    pub fn status(&self) -> Result<BookmarkStatus, AccessError> {
        let Some(bytes) = self.store.load(&self.config.bookmark_key)? else {
            return Ok(BookmarkStatus::Missing);
        };
        Ok(match self.platform.resolve_bookmark(&Bookmark::new(bytes)) {
            Ok(resolved) if resolved.is_stale => BookmarkStatus::Stale {
                directory: resolved.directory,
            },
            Ok(resolved) => BookmarkStatus::Fresh {
                directory: resolved.directory,
            },
            Err(e) => BookmarkStatus::Unresolvable {
                reason: e.to_string(),
            },
        })
    }

    async fn run_request(&self) -> Result<ResolvedLibraryPath, AccessError> {
        let access = self.resolve_stored_bookmark()?;
        let (directory, new_bookmark) = match &access {
            Some(access) => (access.directory().to_path_buf(), None),
            None => {
                let (directory, bookmark) = self.request_new_grant().await?;
                (directory, Some(bookmark))
            }
        };

        let library = ResolvedLibraryPath::compose(&directory, &self.config.library_file());
        let value = library.to_env_value()?;

        // The previous bookmark stays until nothing else can fail.
        if let Some(bookmark) = new_bookmark {
            self.store
                .save(&self.config.bookmark_key, bookmark.as_bytes())?;
            tracing::info!(
                "Stored bookmark for Python library directory {}",
                directory.display()
            );
        }

        self.environment
            .set(&self.config.environment_variable, value);
        tracing::info!("Set {}={}", self.config.environment_variable, value);

        // Replacing drops, and so releases, any grant from an earlier request.
        *self.access_slot() = access;

        inspect_library(&library);
        Ok(library)
    }

    /// Scoped access from a fresh stored bookmark, or None if one must be requested.
    fn resolve_stored_bookmark(&self) -> Result<Option<ScopedAccess>, AccessError> {
        let Some(bytes) = self.store.load(&self.config.bookmark_key)? else {
            tracing::debug!("No stored bookmark under '{}'", self.config.bookmark_key);
            return Ok(None);
        };

        let resolved = self.platform.resolve_bookmark(&Bookmark::new(bytes))?;
        if resolved.is_stale {
            tracing::warn!(
                "Stored bookmark for {} is stale, asking for access again",
                resolved.directory.display()
            );
            return Ok(None);
        }

        tracing::debug!(
            "Resolved stored bookmark to {}",
            resolved.directory.display()
        );
        ScopedAccess::begin(resolved.directory, resolved.scope).map(Some)
    }

    async fn request_new_grant(&self) -> Result<(PathBuf, Bookmark), AccessError> {
        let initial_directory = parse_suggested_location(&self.config.suggested_directory)?;
        let library_file = self.config.library_file();
        let request = PickerRequest::directory(
            self.config.picker_message.clone(),
            initial_directory,
            library_file.extension,
        );

        let _ = self.state.transition_to_prompting();
        let directory = self
            .platform
            .select_directory(&request)
            .await?
            .ok_or(AccessError::NoPathSelected)?;

        let bookmark = self.platform.create_bookmark(&directory)?;
        Ok((directory, bookmark))
    }

    fn access_slot(&self) -> MutexGuard<'_, Option<ScopedAccess>> {
        self.access.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for LibraryAccessBroker {
    fn drop(&mut self) {
        self.release_access();
    }
}
