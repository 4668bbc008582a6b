//! Telemetry initialisation primitives and logging configuration.
//!
//! # Design
//! - Centralises logging setup (fmt or JSON) with a single entry point.
//! - Records the build SHA once to avoid inconsistencies across modules.
//! - Optionally mirrors every record into a per-run log file.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{Result, TelemetryError};

/// Default logging target when `RUST_LOG` is not provided.
pub const DEFAULT_LOG_LEVEL: &str = "info";

static BUILD_SHA: OnceCell<String> = OnceCell::new();

/// Configure and install the global tracing subscriber.
///
/// Returns the path of the run log file when `config.directory` is set.
///
/// # Errors
///
/// Returns an error if the log file cannot be created or if the tracing
/// subscriber cannot be installed (for example, because another subscriber has
/// already been set globally).
pub fn init_logging(config: &LoggingConfig<'_>) -> Result<Option<PathBuf>> {
    BUILD_SHA
        .set(config.build_sha.to_string())
        .ok()
        .or(Some(()));

    let (file_layer, path) = match config.directory {
        Some(directory) => {
            let path = log_file_path(directory, config.label, Utc::now());
            let file = open_log_file(directory, &path)?;
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file));
            (Some(layer), Some(path))
        }
        None => (None, None),
    };

    match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(file_layer)
            .with(build_env_filter(config.level))
            .with(
                fmt::layer()
                    .json()
                    .with_target(false)
                    .with_thread_ids(false),
            )
            .try_init()
            .map_err(|source| TelemetryError::SubscriberInstall { source })?,
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(file_layer)
            .with(build_env_filter(config.level))
            .with(fmt::layer().with_target(false).with_thread_ids(false))
            .try_init()
            .map_err(|source| TelemetryError::SubscriberInstall { source })?,
    }

    Ok(path)
}

/// Access the build SHA recorded during logging initialisation.
#[must_use]
pub fn build_sha() -> &'static str {
    BUILD_SHA.get().map_or("dev", String::as_str)
}

/// Name of the per-run log file: `<dir>/tapemig_<label>_<timestamp>.log`.
#[must_use]
pub fn log_file_path(directory: &Path, label: &str, started_at: DateTime<Utc>) -> PathBuf {
    directory.join(format!(
        "tapemig_{label}_{}.log",
        started_at.format("%Y%m%d_%H%M%S")
    ))
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig<'a> {
    /// Log level string (e.g., `info`, `debug`).
    pub level: &'a str,
    /// Output format selection for the tracing subscriber.
    pub format: LogFormat,
    /// Build identifier recorded in structured logs.
    pub build_sha: &'a str,
    /// Directory receiving the per-run log file, if any.
    pub directory: Option<&'a Path>,
    /// Label embedded in the log file name.
    pub label: &'a str,
}

impl Default for LoggingConfig<'_> {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL,
            format: LogFormat::infer(),
            build_sha: build_sha(),
            directory: None,
            label: "run",
        }
    }
}

/// Available output formats for the logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Emit logs as structured JSON objects.
    Json,
    /// Emit human-readable, pretty-printed logs.
    Pretty,
}

impl LogFormat {
    /// Choose a sensible default for the current build.
    #[must_use]
    pub const fn infer() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }

    /// Map a configured format name, inferring one when absent or unknown.
    #[must_use]
    pub fn from_name(name: Option<&str>) -> Self {
        match name {
            Some("json") => Self::Json,
            Some("pretty") => Self::Pretty,
            _ => Self::infer(),
        }
    }
}

fn open_log_file(directory: &Path, path: &Path) -> Result<File> {
    fs::create_dir_all(directory).map_err(|source| TelemetryError::LogFile {
        path: directory.to_path_buf(),
        source,
    })?;
    File::create(path).map_err(|source| TelemetryError::LogFile {
        path: path.to_path_buf(),
        source,
    })
}

fn build_env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}
