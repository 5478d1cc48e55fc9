//! # Shell Module
//!
//! Entry point and argument parsing for the `pylib_access` binary.

pub mod cli;

pub use cli::{Cli, Command, run};
