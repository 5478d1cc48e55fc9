//! # pylib_access CLI
//!
//! Command-line interface definition and main entry point.

use crate::{BookmarkStatus, BrokerConfig, LibraryAccessBroker, utils::logging::init_logging};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

/// Grant a sandboxed app persistent access to the Python library directory.
#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about,
    long_about = "pylib_access asks once for access to the directory holding libpython,
remembers the grant as a security-scoped bookmark, and publishes the library
path in PYTHON_LIBRARY.

Examples:
   pylib_access request --suggested-path /opt/homebrew/opt/python@3.10/lib
   eval \"$(pylib_access request --export)\"
   pylib_access status
   pylib_access forget"
)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Log to stderr instead of file
    #[arg(long, global = true)]
    pub log_to_stderr: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Resolve the stored grant or ask for one, then print the library path
    Request {
        /// Directory the picker opens at
        #[arg(long)]
        suggested_path: Option<String>,

        /// Print a shell `export` line instead of the bare path
        #[arg(long)]
        export: bool,
    },

    /// Show the stored bookmark without prompting
    Status,

    /// Delete the stored bookmark so the next request prompts again
    Forget,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug { "debug" } else { "info" };
    init_logging(log_level, !cli.log_to_stderr)?;

    let mut config =
        BrokerConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Command::Request {
        suggested_path: Some(path),
        ..
    } = &cli.command
    {
        config.suggested_directory = path.clone();
    }

    let broker =
        LibraryAccessBroker::native(config).context("Failed to set up Python library access")?;

    let mut stdout = std::io::stdout().lock();
    let result = execute(&cli.command, &broker, &mut stdout).await;
    broker.release_access();
    result
}

/// Run one command against `broker`, writing user-facing output to `out`.
pub async fn execute(
    command: &Command,
    broker: &LibraryAccessBroker,
    out: &mut dyn Write,
) -> Result<()> {
    match command {
        Command::Request { export, .. } => {
            let library = broker
                .request_access()
                .await
                .context("Failed to obtain access to the Python library directory")?;
            if *export {
                writeln!(
                    out,
                    "export {}={}",
                    broker.config().environment_variable,
                    shell_quote(&library.to_string())
                )?;
            } else {
                writeln!(out, "{library}")?;
            }
        }
        Command::Status => {
            let status = broker.status().context("Failed to read stored bookmark")?;
            writeln!(out, "{}", describe_status(&status))?;
        }
        Command::Forget => {
            if broker.forget_bookmark()? {
                writeln!(out, "Removed stored bookmark")?;
            } else {
                writeln!(out, "No stored bookmark")?;
            }
        }
    }
    Ok(())
}

pub fn describe_status(status: &BookmarkStatus) -> String {
    match status {
        BookmarkStatus::Missing => "No stored bookmark".to_string(),
        BookmarkStatus::Fresh { directory } => {
            format!("Bookmark valid: {}", directory.display())
        }
        BookmarkStatus::Stale { directory } => {
            format!("Bookmark stale: {} (next request will prompt)", directory.display())
        }
        BookmarkStatus::Unresolvable { reason } => {
            format!("Bookmark unresolvable: {reason} (run `pylib_access forget`)")
        }
    }
}

/// Single-quote `value` for POSIX shells.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request_with_flags() {
        let cli = Cli::try_parse_from([
            "pylib_access",
            "--debug",
            "request",
            "--suggested-path",
            "/opt/python/lib",
            "--export",
        ])
        .unwrap();
        assert!(cli.debug);
        assert_eq!(
            cli.command,
            Command::Request {
                suggested_path: Some("/opt/python/lib".to_string()),
                export: true,
            }
        );
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["pylib_access", "status", "--log-to-stderr"]).unwrap();
        assert!(cli.log_to_stderr);
        assert_eq!(cli.command, Command::Status);
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["pylib_access"]).is_err());
    }

    #[test]
    fn test_shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("/opt/it's/lib"), r"'/opt/it'\''s/lib'");
    }
}
