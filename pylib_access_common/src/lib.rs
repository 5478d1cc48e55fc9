//! Types shared between the `pylib_access` broker and the hosts that observe it.

pub mod access_state;

pub use access_state::{AccessState, AccessStateMachine};
