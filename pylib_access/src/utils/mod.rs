//! Miscellaneous helpers.

pub mod logging;
