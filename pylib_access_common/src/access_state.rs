//! Observable state of a library access request.
//!
//! The broker publishes every step of its request sequence here so that hosts
//! can await the outcome instead of polling the environment variable. Uses
//! `tokio::sync::watch`, so subscribers are woken on each transition.
//!
//! # Example
//!
//! ```rust,ignore
//! use pylib_access_common::access_state::AccessStateMachine;
//! use std::path::PathBuf;
//!
//! let sm = AccessStateMachine::new();
//! sm.transition_to_resolving().unwrap();
//! sm.transition_to_granted(PathBuf::from("/opt/python/lib/libpython3.10.dylib")).unwrap();
//!
//! let library = sm.wait_for_outcome().await?;
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

/// Lifecycle of a single broker's access grant.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessState {
    /// No request has been made yet
    Idle,

    /// Looking up and resolving the stored bookmark
    Resolving,

    /// The directory picker is on screen, waiting for the user
    Prompting,

    /// Access granted and the library path published
    Granted { library: PathBuf },

    /// The last request failed
    Failed { error: String },

    /// The scoped grant was released
    Released,
}

impl AccessState {
    /// Returns true while a request is running.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, AccessState::Resolving | AccessState::Prompting)
    }

    /// Returns true if the last request finished, successfully or not.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            AccessState::Granted { .. } | AccessState::Failed { .. } | AccessState::Released
        )
    }

    /// Returns the published library path if access is currently granted.
    pub fn library(&self) -> Option<&PathBuf> {
        match self {
            AccessState::Granted { library } => Some(library),
            _ => None,
        }
    }
}

/// Watch-channel backed state machine shared between a broker and its observers.
#[derive(Clone)]
pub struct AccessStateMachine {
    sender: Arc<watch::Sender<AccessState>>,
    // Keeps the channel open when nobody has subscribed yet
    _receiver: watch::Receiver<AccessState>,
}

impl std::fmt::Debug for AccessStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessStateMachine")
            .field("state", &*self.sender.borrow())
            .finish()
    }
}

impl AccessStateMachine {
    /// Create a new state machine in the `Idle` state.
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(AccessState::Idle);
        Self {
            sender: Arc::new(sender),
            _receiver: receiver,
        }
    }

    /// Get the current state without blocking
    pub fn current(&self) -> AccessState {
        self.sender.borrow().clone()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<AccessState> {
        self.sender.subscribe()
    }

    /// Start a new request. Allowed from any state except an in-flight one.
    pub fn transition_to_resolving(&self) -> Result<(), &'static str> {
        self.transition(
            |state| !state.is_in_flight(),
            |_| AccessState::Resolving,
            "A request is already in flight",
        )
    }

    /// Resolving found no usable bookmark and the picker is being shown.
    pub fn transition_to_prompting(&self) -> Result<(), &'static str> {
        self.transition(
            |state| matches!(state, AccessState::Resolving),
            |_| AccessState::Prompting,
            "Can only transition to Prompting from Resolving",
        )
    }

    /// Finish the in-flight request successfully.
    pub fn transition_to_granted(&self, library: PathBuf) -> Result<(), &'static str> {
        self.transition(
            AccessState::is_in_flight,
            |_| AccessState::Granted { library },
            "Can only transition to Granted from an in-flight request",
        )
    }

    /// Finish the in-flight request with an error.
    pub fn transition_to_failed(&self, error: String) -> Result<(), &'static str> {
        self.transition(
            AccessState::is_in_flight,
            |_| AccessState::Failed { error },
            "Can only transition to Failed from an in-flight request",
        )
    }

    /// Record that the scoped grant was released.
    pub fn transition_to_released(&self) -> Result<(), &'static str> {
        self.transition(
            |state| matches!(state, AccessState::Granted { .. }),
            |_| AccessState::Released,
            "Can only transition to Released from Granted",
        )
    }

    fn transition(
        &self,
        allowed: impl Fn(&AccessState) -> bool,
        next: impl FnOnce(&AccessState) -> AccessState,
        error: &'static str,
    ) -> Result<(), &'static str> {
        let mut next = Some(next);
        let mut transitioned = false;
        self.sender.send_if_modified(|state| {
            if allowed(&*state)
                && let Some(next) = next.take()
            {
                *state = next(&*state);
                transitioned = true;
                true
            } else {
                false
            }
        });
        if transitioned { Ok(()) } else { Err(error) }
    }

    /// Wait until the current request settles.
    ///
    /// Returns the published library path, or the error message if the
    /// request failed or the grant has already been released.
    pub async fn wait_for_outcome(&self) -> Result<PathBuf, String> {
        let mut rx = self.sender.subscribe();
        loop {
            {
                let state = rx.borrow_and_update();
                match &*state {
                    AccessState::Granted { library } => return Ok(library.clone()),
                    AccessState::Failed { error } => return Err(error.clone()),
                    AccessState::Released => return Err("Access released".to_string()),
                    _ => {}
                }
            }
            if rx.changed().await.is_err() {
                return Err("State machine dropped".to_string());
            }
        }
    }
}

impl Default for AccessStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    fn library() -> PathBuf {
        PathBuf::from("/opt/python/lib/libpython3.10.dylib")
    }

    #[test]
    fn test_valid_transitions() {
        let sm = AccessStateMachine::new();
        assert_eq!(sm.current(), AccessState::Idle);

        sm.transition_to_resolving().unwrap();
        sm.transition_to_prompting().unwrap();
        sm.transition_to_granted(library()).unwrap();
        assert_eq!(sm.current().library(), Some(&library()));

        sm.transition_to_released().unwrap();
        assert_eq!(sm.current(), AccessState::Released);
    }

    #[test]
    fn test_cannot_prompt_when_idle() {
        let sm = AccessStateMachine::new();
        assert!(sm.transition_to_prompting().is_err());
        assert!(sm.transition_to_granted(library()).is_err());
    }

    #[test]
    fn test_cannot_start_second_request_in_flight() {
        let sm = AccessStateMachine::new();
        sm.transition_to_resolving().unwrap();
        assert!(sm.transition_to_resolving().is_err());
    }

    #[test]
    fn test_new_request_after_failure() {
        let sm = AccessStateMachine::new();
        sm.transition_to_resolving().unwrap();
        sm.transition_to_failed("no path".to_string()).unwrap();
        assert!(sm.current().is_settled());

        sm.transition_to_resolving().unwrap();
        assert!(sm.current().is_in_flight());
    }

    #[test]
    fn test_release_only_from_granted() {
        let sm = AccessStateMachine::new();
        assert!(sm.transition_to_released().is_err());

        sm.transition_to_resolving().unwrap();
        sm.transition_to_granted(library()).unwrap();
        sm.transition_to_released().unwrap();
        assert!(sm.transition_to_released().is_err());
    }

    #[tokio::test]
    async fn test_wait_for_outcome_granted() {
        let sm = AccessStateMachine::new();
        let sm_clone = sm.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            sm_clone.transition_to_resolving().unwrap();
            sm_clone.transition_to_prompting().unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            sm_clone.transition_to_granted(library()).unwrap();
        });

        let result = timeout(Duration::from_secs(1), sm.wait_for_outcome()).await;
        assert_eq!(result.unwrap().unwrap(), library());
    }

    #[tokio::test]
    async fn test_wait_for_outcome_failed() {
        let sm = AccessStateMachine::new();
        let sm_clone = sm.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            sm_clone.transition_to_resolving().unwrap();
            sm_clone
                .transition_to_failed("user cancelled".to_string())
                .unwrap();
        });

        let result = timeout(Duration::from_secs(1), sm.wait_for_outcome()).await;
        assert_eq!(result.unwrap().unwrap_err(), "user cancelled");
    }

    #[test]
    fn test_subscribe_receives_updates() {
        let sm = AccessStateMachine::new();
        let mut rx = sm.subscribe();
        assert_eq!(*rx.borrow(), AccessState::Idle);

        sm.transition_to_resolving().unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), AccessState::Resolving);
    }
}
