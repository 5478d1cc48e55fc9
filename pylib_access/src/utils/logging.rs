//! # Logging Initialization
//!
//! `init_logging()` installs the global `tracing` subscriber once per process
//! and reports where events go as a [`LogTarget`].
//!
//! - **Filter**: `RUST_LOG` if set, else `<log_level>,pylib_access=debug`.
//! - **File (default)**: daily rolling `pylib_access.<date>.log` under
//!   `PYLIB_ACCESS_LOG_DIR`, or the `directories` cache dir. Inside an app
//!   sandbox that cache dir lives in the app's container.
//! - **Stderr**: when `log_to_file = false`, or when no log directory can be
//!   created and written.
//! - **OpenTelemetry** (`opentelemetry` feature): an OTLP span exporter is
//!   added when `OTEL_EXPORTER_OTLP_TRACES_ENDPOINT`,
//!   `OTEL_EXPORTER_OTLP_ENDPOINT` or `PYLIB_ACCESS_TRACING` is set.

use crate::constants::{PROJECT_APPLICATION, PROJECT_ORGANIZATION, PROJECT_QUALIFIER};
use anyhow::Result;
use directories::ProjectDirs;
#[cfg(feature = "opentelemetry")]
use opentelemetry::trace::TracerProvider;
#[cfg(feature = "opentelemetry")]
use opentelemetry_otlp::WithExportConfig;
#[cfg(feature = "opentelemetry")]
use opentelemetry_sdk::{
    Resource,
    trace::{self as sdktrace, SdkTracerProvider},
};
use std::io::stderr;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt::layer, prelude::*};

/// Overrides the log directory.
pub const LOG_DIR_ENV_VAR: &str = "PYLIB_ACCESS_LOG_DIR";

/// Turns on span export to a local collector when no OTLP endpoint is set.
pub const TRACING_ENV_VAR: &str = "PYLIB_ACCESS_TRACING";

const DEFAULT_OTLP_TRACES_ENDPOINT: &str = "http://localhost:4318/v1/traces";

static LOGGING: OnceLock<Result<LogTarget, String>> = OnceLock::new();
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Where formatted events are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    File(PathBuf),
    Stderr,
}

/// Verbose stderr logging for tests.
pub fn init_test_logging() {
    let _ = init_logging("trace", false);
}

/// The filter directive used when `RUST_LOG` is not set.
pub fn default_filter(log_level: &str) -> String {
    format!("{log_level},pylib_access=debug")
}

/// Initializes the logging system. Later calls return the first outcome.
///
/// # Errors
///
/// Fails if another global subscriber was installed first.
pub fn init_logging(log_level: &str, log_to_file: bool) -> Result<LogTarget> {
    LOGGING
        .get_or_init(|| install(log_level, log_to_file))
        .clone()
        .map_err(anyhow::Error::msg)
}

fn install(log_level: &str, log_to_file: bool) -> Result<LogTarget, String> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(log_level)));

    let appender = log_directory(log_to_file, env_var)
        .and_then(|dir| file_appender(&dir).map(|appender| (dir, appender)));

    let (file_layer, stderr_layer, target) = match appender {
        Some((dir, appender)) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            // Kept for the life of the process so buffered lines are flushed.
            let _ = FILE_GUARD.set(guard);
            (
                Some(layer().with_writer(writer).with_ansi(false)),
                None,
                LogTarget::File(dir),
            )
        }
        None => (
            None,
            Some(layer().with_writer(stderr).with_ansi(true)),
            LogTarget::Stderr,
        ),
    };

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer);

    #[cfg(feature = "opentelemetry")]
    let subscriber =
        subscriber.with(otlp_traces_endpoint(env_var).and_then(|endpoint| otel_layer(&endpoint)));

    subscriber.try_init().map_err(|e| e.to_string())?;
    tracing::debug!("Logging initialized: {:?}", target);
    Ok(target)
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

/// The directory for log files, or None when logging to stderr.
fn log_directory(log_to_file: bool, var: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    if !log_to_file {
        return None;
    }
    if let Some(dir) = var(LOG_DIR_ENV_VAR) {
        return Some(PathBuf::from(dir));
    }
    ProjectDirs::from(PROJECT_QUALIFIER, PROJECT_ORGANIZATION, PROJECT_APPLICATION)
        .map(|dirs| dirs.cache_dir().to_path_buf())
}

fn file_appender(dir: &Path) -> Option<RollingFileAppender> {
    if !can_write_to(dir) {
        return None;
    }
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(PROJECT_APPLICATION)
        .filename_suffix("log")
        .build(dir)
        .ok()
}

/// The OTLP traces endpoint to export to, or None when export is off.
///
/// A signal-specific endpoint is used as given; the generic one gets the
/// `/v1/traces` path appended, as the OTLP exporter conventions specify.
#[cfg_attr(not(feature = "opentelemetry"), allow(dead_code))]
fn otlp_traces_endpoint(var: impl Fn(&str) -> Option<String>) -> Option<String> {
    if let Some(endpoint) = var("OTEL_EXPORTER_OTLP_TRACES_ENDPOINT") {
        return Some(endpoint);
    }
    if let Some(base) = var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        return Some(format!("{}/v1/traces", base.trim_end_matches('/')));
    }
    var(TRACING_ENV_VAR).map(|_| DEFAULT_OTLP_TRACES_ENDPOINT.to_string())
}

#[cfg(feature = "opentelemetry")]
fn otel_layer<S>(
    endpoint: &str,
) -> Option<tracing_opentelemetry::OpenTelemetryLayer<S, sdktrace::Tracer>>
where
    S: tracing::Subscriber + for<'span> tracing_subscriber::registry::LookupSpan<'span>,
{
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
        .ok()?;

    let resource = Resource::builder()
        .with_service_name(PROJECT_APPLICATION)
        .build();

    let provider = SdkTracerProvider::builder()
        .with_resource(resource)
        .with_batch_exporter(exporter)
        .build();

    let tracer = provider.tracer(PROJECT_APPLICATION);

    Some(tracing_opentelemetry::layer().with_tracer(tracer))
}

/// Create `dir` if needed and check a file can be written there.
pub(crate) fn can_write_to(dir: &Path) -> bool {
    if std::fs::create_dir_all(dir).is_err() {
        return false;
    }

    let probe = dir.join(".pylib_access_log_test");
    match std::fs::write(&probe, "test") {
        Ok(()) => {
            let _ = std::fs::remove_file(&probe);
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_filter_format() {
        assert_eq!(default_filter("info"), "info,pylib_access=debug");
        assert_eq!(default_filter("trace"), "trace,pylib_access=debug");
    }

    #[test]
    fn test_can_write_to_creates_directory() {
        let temp = tempfile::tempdir().unwrap();
        let log_dir = temp.path().join("nested").join("logs");
        assert!(can_write_to(&log_dir));
        assert!(log_dir.is_dir());
        assert!(!log_dir.join(".pylib_access_log_test").exists());
    }

    #[test]
    fn test_log_directory_honours_override() {
        let dir = log_directory(true, vars(&[(LOG_DIR_ENV_VAR, "/tmp/pylib_logs")]));
        assert_eq!(dir, Some(PathBuf::from("/tmp/pylib_logs")));
    }

    #[test]
    fn test_log_directory_none_for_stderr() {
        assert_eq!(
            log_directory(false, vars(&[(LOG_DIR_ENV_VAR, "/tmp/pylib_logs")])),
            None
        );
    }

    #[test]
    fn test_file_appender_writes_into_directory() {
        let temp = tempfile::tempdir().unwrap();
        assert!(file_appender(temp.path()).is_some());
    }

    #[test]
    fn test_otlp_endpoint_follows_generic_variable() {
        let endpoint = otlp_traces_endpoint(vars(&[(
            "OTEL_EXPORTER_OTLP_ENDPOINT",
            "http://collector.internal:4318/",
        )]));
        assert_eq!(
            endpoint.as_deref(),
            Some("http://collector.internal:4318/v1/traces")
        );
    }

    #[test]
    fn test_otlp_traces_endpoint_takes_precedence() {
        let endpoint = otlp_traces_endpoint(vars(&[
            ("OTEL_EXPORTER_OTLP_ENDPOINT", "http://generic:4318"),
            ("OTEL_EXPORTER_OTLP_TRACES_ENDPOINT", "http://traces:4318/custom"),
        ]));
        assert_eq!(endpoint.as_deref(), Some("http://traces:4318/custom"));
    }

    #[test]
    fn test_otlp_tracing_flag_uses_local_collector() {
        assert_eq!(
            otlp_traces_endpoint(vars(&[(TRACING_ENV_VAR, "1")])).as_deref(),
            Some(DEFAULT_OTLP_TRACES_ENDPOINT)
        );
        assert_eq!(otlp_traces_endpoint(vars(&[])), None);
    }

    #[cfg(feature = "opentelemetry")]
    #[test]
    fn test_otel_layer_builds_for_configured_endpoint() {
        let layer = otel_layer::<tracing_subscriber::Registry>(
            "http://collector.internal:4318/v1/traces",
        );
        assert!(layer.is_some());
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        let first = init_logging("debug", false).unwrap();
        assert_eq!(first, LogTarget::Stderr);
        assert_eq!(init_logging("info", true).unwrap(), LogTarget::Stderr);
    }
}
