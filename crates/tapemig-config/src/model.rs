//! Typed configuration model.
//!
//! # Design
//! - Pure data carriers deserialised from YAML; defaults live in `defaults.rs`.
//! - Unknown keys are rejected so typos surface at load time.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tapemig_core::LinkMode;

use crate::defaults;

/// Root configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationConfig {
    /// Relational store holding the name mapping and tape register.
    pub database: DatabaseConfig,
    /// Tape discovery and worker pool.
    pub executor: ExecutorConfig,
    /// Tape import confirmation polling.
    #[serde(default)]
    pub confirmer: ConfirmerConfig,
    /// Slicing tool invocation.
    pub slicer: SlicerConfig,
    /// Sanity-check tool invocation; the stage is skipped when absent.
    #[serde(default)]
    pub sanity_checker: Option<SanityCheckerConfig>,
    /// Link creation.
    pub linker: LinkerConfig,
    /// Object storage upload.
    pub uploader: UploaderConfig,
    /// Logging output.
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl MigrationConfig {
    /// Sanity-check settings when the stage is enabled.
    #[must_use]
    pub fn active_sanity_checker(&self) -> Option<&SanityCheckerConfig> {
        self.sanity_checker.as_ref().filter(|cfg| cfg.enabled)
    }
}

/// Database connection and table names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Connection URL; `DATABASE_URL` overrides it.
    #[serde(default)]
    pub url: String,
    /// Upper bound on pooled connections.
    #[serde(default = "defaults::max_connections")]
    pub max_connections: u32,
    /// Table holding `agid_name_src → agid_name_dst` rows.
    #[serde(default = "defaults::mapping_table")]
    pub mapping_table: String,
    /// Table holding `(tape_name, status)` rows.
    #[serde(default = "defaults::register_table")]
    pub register_table: String,
}

/// Tape discovery and worker pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutorConfig {
    /// Directory whose regular files are the tapes to migrate.
    pub input_directory: PathBuf,
    /// Concurrent tapes.
    #[serde(default = "defaults::executor_workers")]
    pub workers: usize,
    /// Root of the per-tape working directories.
    pub work_root: PathBuf,
}

/// Tape import confirmation polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfirmerConfig {
    /// Extension appended to the tape name to form the ready marker.
    #[serde(default = "defaults::ready_extension")]
    pub ready_extension: String,
    /// Give up after this many seconds.
    #[serde(default = "defaults::confirmer_timeout_secs")]
    pub timeout_secs: u64,
    /// Sleep between polls.
    #[serde(default = "defaults::confirmer_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl ConfirmerConfig {
    /// Timeout as a duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Poll interval as a duration.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl Default for ConfirmerConfig {
    fn default() -> Self {
        Self {
            ready_extension: defaults::ready_extension(),
            timeout_secs: defaults::confirmer_timeout_secs(),
            poll_interval_secs: defaults::confirmer_poll_interval_secs(),
        }
    }
}

/// Slicing tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlicerConfig {
    /// Absolute path of the slicer executable.
    pub executable: PathBuf,
    /// Per-tape subdirectory receiving sliced files.
    #[serde(default = "defaults::slicer_output_subdir")]
    pub output_subdir: String,
    /// Per-tape subdirectory receiving tool logs.
    #[serde(default = "defaults::slicer_log_subdir")]
    pub log_subdir: String,
    /// Slicer log file name inside the log subdirectory.
    #[serde(default = "defaults::slicer_log_file")]
    pub log_file_name: String,
}

/// Sanity-check tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SanityCheckerConfig {
    /// Run the stage; defaults to `true` when the section is present.
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,
    /// Absolute path of the sanity-check executable.
    pub executable: PathBuf,
    /// Log file name inside the slicer log subdirectory.
    #[serde(default = "defaults::sanity_checker_log_file")]
    pub log_file_name: String,
}

/// Link creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkerConfig {
    /// Per-tape subdirectory receiving the link tree.
    #[serde(default = "defaults::linker_output_subdir")]
    pub output_subdir: String,
    /// Glob patterns, relative to the slicer output, selecting files to link.
    pub file_patterns: Vec<String>,
    /// Hard or symbolic links.
    #[serde(default)]
    pub link_mode: LinkMode,
    /// Threads sharing one tape's link tasks.
    #[serde(default = "defaults::linker_workers")]
    pub workers: usize,
}

/// Object storage upload through the AWS CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UploaderConfig {
    /// Destination bucket.
    pub bucket: String,
    /// Key prefix inside the bucket.
    #[serde(default)]
    pub prefix: String,
    /// Custom S3 endpoint (e.g. an on-premises object store).
    #[serde(default)]
    pub endpoint_url: Option<String>,
    /// Verify TLS certificates of the endpoint.
    #[serde(default = "defaults::enabled")]
    pub verify_ssl: bool,
    /// AWS CLI executable, resolved through `PATH` when relative.
    #[serde(default = "defaults::aws_executable")]
    pub aws_executable: PathBuf,
}

/// Logging output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSettings {
    /// Level used when `RUST_LOG` is unset.
    #[serde(default = "defaults::log_level")]
    pub level: String,
    /// `json` or `pretty`; inferred from the build when absent.
    #[serde(default)]
    pub format: Option<String>,
    /// Directory receiving a per-run log file.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    /// Label embedded in the log file name.
    #[serde(default = "defaults::log_label")]
    pub label: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
            format: None,
            directory: None,
            label: defaults::log_label(),
        }
    }
}
