//! Fixed identifiers shared by the broker, the storage backends and the CLI.

/// Directory offered to the user when the picker opens.
pub const DEFAULT_SUGGESTED_DIRECTORY: &str = "/usr/local/bin/python3/lib";

/// Base name of the shared library, without extension.
pub const PYTHON_LIBRARY_BASE_NAME: &str = "libpython3.10";

/// Shared library extension on Apple platforms.
pub const APPLE_LIBRARY_EXTENSION: &str = "dylib";

/// Shared library extension on other POSIX platforms.
pub const POSIX_LIBRARY_EXTENSION: &str = "so";

/// Extension used for the library on the platform this crate was built for.
#[cfg(target_os = "macos")]
pub const PLATFORM_LIBRARY_EXTENSION: &str = APPLE_LIBRARY_EXTENSION;
#[cfg(not(target_os = "macos"))]
pub const PLATFORM_LIBRARY_EXTENSION: &str = POSIX_LIBRARY_EXTENSION;

/// Environment variable read by the dynamic loader.
pub const PYTHON_LIBRARY_ENV_VAR: &str = "PYTHON_LIBRARY";

/// Key the bookmark is stored under.
pub const BOOKMARK_STORE_KEY: &str = "PYTHON_LIB_DIR";

/// Message shown at the top of the directory picker.
pub const PICKER_MESSAGE: &str = "You need to select the location of the directory containing your \
Python libraries to allow access (defaulted path is a guess at the location)";

/// Extended attribute macOS attaches to downloaded files.
pub const QUARANTINE_XATTR: &str = "com.apple.quarantine";

/// Overrides the suggested directory from the environment.
pub const SUGGESTED_DIR_ENV_VAR: &str = "PYLIB_ACCESS_SUGGESTED_DIR";

/// Identifiers used with `directories::ProjectDirs`.
pub const PROJECT_QUALIFIER: &str = "com";
pub const PROJECT_ORGANIZATION: &str = "PyLibAccess";
pub const PROJECT_APPLICATION: &str = "pylib_access";

/// File name of the JSON bookmark store.
pub const BOOKMARK_FILE_NAME: &str = "bookmarks.json";

/// File name of the optional TOML configuration.
pub const CONFIG_FILE_NAME: &str = "config.toml";
