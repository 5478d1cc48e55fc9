//! Test helpers: a scripted [`Platform`] and counters for scoped access.
//!
//! `ScriptedPlatform` encodes bookmarks as `bookmark:<path>` so tests can
//! seed a store without going through the picker.

use crate::config::BrokerConfig;
use crate::environment::MemoryEnvironment;
use crate::error::AccessError;
use crate::platform::{Bookmark, PickerRequest, Platform, ResolvedBookmark, SecurityScope};
use crate::storage::MemoryStore;
use crate::LibraryAccessBroker;
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const BOOKMARK_PREFIX: &str = "bookmark:";

/// Fake bookmark bytes for `directory`.
pub fn fake_bookmark(directory: &Path) -> Vec<u8> {
    format!("{BOOKMARK_PREFIX}{}", directory.display()).into_bytes()
}

/// Shared start/stop counts of every scope a platform hands out.
#[derive(Debug, Default, Clone)]
pub struct ScopeCounters {
    started: Arc<AtomicUsize>,
    stopped: Arc<AtomicUsize>,
}

impl ScopeCounters {
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn stopped(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Scopes started and not yet stopped.
    pub fn outstanding(&self) -> usize {
        self.started() - self.stopped()
    }
}

pub struct CountingScope {
    counters: ScopeCounters,
    allow: bool,
}

impl CountingScope {
    pub fn new(counters: ScopeCounters, allow: bool) -> Self {
        Self { counters, allow }
    }
}

impl SecurityScope for CountingScope {
    fn start(&mut self) -> bool {
        self.counters.started.fetch_add(1, Ordering::SeqCst);
        self.allow
    }

    fn stop(&mut self) {
        self.counters.stopped.fetch_add(1, Ordering::SeqCst);
    }
}

/// What the next picker invocation returns.
#[derive(Debug, Clone)]
pub enum PickerResponse {
    Select(PathBuf),
    Cancel,
}

#[derive(Default)]
pub struct ScriptedPlatform {
    responses: Mutex<VecDeque<PickerResponse>>,
    requests: Mutex<Vec<PickerRequest>>,
    picker_calls: AtomicUsize,
    picker_delay: Mutex<Option<Duration>>,
    stale: Mutex<HashSet<PathBuf>>,
    fail_create: AtomicBool,
    refuse_scope: AtomicBool,
    counters: ScopeCounters,
}

impl ScriptedPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(self, directory: impl Into<PathBuf>) -> Self {
        self.push_response(PickerResponse::Select(directory.into()));
        self
    }

    pub fn cancel(self) -> Self {
        self.push_response(PickerResponse::Cancel);
        self
    }

    pub fn push_response(&self, response: PickerResponse) {
        self.responses.lock().unwrap().push_back(response);
    }

    /// Keep the picker "on screen" for this long.
    pub fn with_picker_delay(self, delay: Duration) -> Self {
        *self.picker_delay.lock().unwrap() = Some(delay);
        self
    }

    /// Report bookmarks for `directory` as stale from now on.
    pub fn mark_stale(&self, directory: impl Into<PathBuf>) {
        self.stale.lock().unwrap().insert(directory.into());
    }

    pub fn fail_bookmark_creation(&self) {
        self.fail_create.store(true, Ordering::SeqCst);
    }

    pub fn refuse_scoped_access(&self) {
        self.refuse_scope.store(true, Ordering::SeqCst);
    }

    pub fn picker_calls(&self) -> usize {
        self.picker_calls.load(Ordering::SeqCst)
    }

    pub fn picker_requests(&self) -> Vec<PickerRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn counters(&self) -> ScopeCounters {
        self.counters.clone()
    }
}

#[async_trait]
impl Platform for ScriptedPlatform {
    async fn select_directory(
        &self,
        request: &PickerRequest,
    ) -> Result<Option<PathBuf>, AccessError> {
        self.picker_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let delay = *self.picker_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let response = self.responses.lock().unwrap().pop_front();
        match response {
            Some(PickerResponse::Select(path)) => Ok(Some(path)),
            Some(PickerResponse::Cancel) | None => Ok(None),
        }
    }

    fn create_bookmark(&self, directory: &Path) -> Result<Bookmark, AccessError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(AccessError::access_failed("bookmark creation refused"));
        }
        Ok(Bookmark::new(fake_bookmark(directory)))
    }

    fn resolve_bookmark(&self, bookmark: &Bookmark) -> Result<ResolvedBookmark, AccessError> {
        let text = std::str::from_utf8(bookmark.as_bytes())
            .map_err(|_| AccessError::access_failed("bookmark is not UTF-8"))?;
        let path = text
            .strip_prefix(BOOKMARK_PREFIX)
            .ok_or_else(|| AccessError::access_failed("corrupt bookmark"))?;
        let directory = PathBuf::from(path);
        let is_stale = self.stale.lock().unwrap().contains(&directory);
        let allow = !self.refuse_scope.load(Ordering::SeqCst);

        Ok(ResolvedBookmark {
            directory,
            is_stale,
            scope: Box::new(CountingScope::new(self.counters.clone(), allow)),
        })
    }
}

/// A broker over in-memory capabilities plus handles to inspect them.
pub struct TestBroker {
    pub broker: LibraryAccessBroker,
    pub platform: Arc<ScriptedPlatform>,
    pub store: MemoryStore,
    pub environment: MemoryEnvironment,
}

impl TestBroker {
    pub fn new(config: BrokerConfig, platform: ScriptedPlatform) -> Self {
        Self::with_capabilities(config, platform, MemoryStore::new(), MemoryEnvironment::new())
    }

    pub fn with_capabilities(
        config: BrokerConfig,
        platform: ScriptedPlatform,
        store: MemoryStore,
        environment: MemoryEnvironment,
    ) -> Self {
        let platform = Arc::new(platform);
        let broker = LibraryAccessBroker::new(
            config,
            platform.clone(),
            Arc::new(store.clone()),
            Arc::new(environment.clone()),
        );
        Self {
            broker,
            platform,
            store,
            environment,
        }
    }
}
