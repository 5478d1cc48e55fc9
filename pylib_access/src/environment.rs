//! Where the resolved library path is published.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Environment variable capability.
pub trait Environment: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;

    /// Set `name`, overwriting any existing value.
    fn set(&self, name: &str, value: &str);
}

/// The real process environment, read by the dynamic loader.
///
/// Writing the process environment is only sound while no other thread reads
/// or writes it, `getenv` calls from C code included. Hosts publish before
/// spawning such threads, or otherwise keep them from touching the
/// environment during a request. A multi-thread runtime, or the helper thread
/// of [`request_access_blocking`], does not by itself make this hold.
///
/// [`request_access_blocking`]: crate::LibraryAccessBroker::request_access_blocking
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn set(&self, name: &str, value: &str) {
        // SAFETY: relies on the host keeping other threads off the
        // environment for the duration of the write, as documented above.
        unsafe { std::env::set_var(name, value) };
    }
}

/// In-memory environment for tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryEnvironment {
    vars: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var(name: &str, value: &str) -> Self {
        let env = Self::default();
        env.set(name, value);
        env
    }
}

impl Environment for MemoryEnvironment {
    fn get(&self, name: &str) -> Option<String> {
        self.vars
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    fn set(&self, name: &str, value: &str) {
        self.vars
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), value.to_string());
    }
}
