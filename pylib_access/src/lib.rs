//! # pylib_access
//!
//! Requests and persists user-granted access to a Python library directory
//! from inside the macOS app sandbox, then publishes the library path in
//! `PYTHON_LIBRARY` for a dynamic loader.
//!
//! ## Modules
//!
//! - **`broker`**: `LibraryAccessBroker`, the bookmark lifecycle. Resolves a
//!   stored bookmark or prompts for a directory, persists the new bookmark,
//!   and publishes the library path.
//!
//! - **`platform`**: the `Platform` capability (directory picker, bookmark
//!   creation and resolution) and the `ScopedAccess` guard. macOS has a
//!   native backend; other platforms get a stub.
//!
//! - **`storage`**: `BookmarkStore` implementations (preferences, JSON file,
//!   memory).
//!
//! - **`environment`**: `Environment` capability the path is published to.
//!
//! - **`config`**: `BrokerConfig`, loaded from TOML.
//!
//! - **`library_path`**: library file naming, hint validation, and checks on
//!   the published file.
//!
//! - **`shell`**: the `pylib_access` command-line interface.

pub mod broker;
pub mod config;
pub mod constants;
pub mod environment;
pub mod error;
pub mod library_path;
pub mod platform;
pub mod shell;
pub mod storage;
pub mod test_utils;
pub mod utils;

pub use broker::{BookmarkStatus, LibraryAccessBroker};
pub use config::BrokerConfig;
pub use error::AccessError;
pub use library_path::ResolvedLibraryPath;
pub use pylib_access_common::{AccessState, AccessStateMachine};
