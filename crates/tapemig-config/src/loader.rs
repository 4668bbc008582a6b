//! Configuration loading with environment overrides.
//!
//! # Design
//! - The file is the base layer; a small set of environment variables wins over it.
//! - Environment access goes through a lookup closure so tests never mutate the process env.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::model::MigrationConfig;
use crate::validate::validate;

/// Connection URL override shared with sqlx tooling.
const ENV_DATABASE_URL: &str = "DATABASE_URL";
const ENV_INPUT_DIRECTORY: &str = "TAPEMIG_INPUT_DIRECTORY";
const ENV_WORK_ROOT: &str = "TAPEMIG_WORK_ROOT";
const ENV_WORKERS: &str = "TAPEMIG_WORKERS";
const ENV_UPLOAD_BUCKET: &str = "TAPEMIG_UPLOAD_BUCKET";
const ENV_LOG_LEVEL: &str = "TAPEMIG_LOG_LEVEL";
const ENV_LOG_FORMAT: &str = "TAPEMIG_LOG_FORMAT";

/// Load, override and validate the configuration at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, if an override is
/// malformed, or if validation fails.
pub fn load_config(path: &Path) -> ConfigResult<MigrationConfig> {
    let document = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config: MigrationConfig =
        serde_yaml::from_str(&document).map_err(|source| ConfigError::Parse {
            path: Some(path.to_path_buf()),
            source,
        })?;
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate(&config)?;
    Ok(config)
}

/// Parse a YAML document without overrides or validation.
///
/// # Errors
///
/// Returns an error if the document does not match the configuration model.
pub fn parse_config(document: &str) -> ConfigResult<MigrationConfig> {
    serde_yaml::from_str(document).map_err(|source| ConfigError::Parse { path: None, source })
}

/// Apply environment overrides using `lookup` to read variables.
///
/// # Errors
///
/// Returns an error if `TAPEMIG_WORKERS` is not a number.
pub fn apply_env_overrides<F>(config: &mut MigrationConfig, lookup: F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    let read = |name: &'static str| {
        lookup(name).filter(|value| !value.trim().is_empty()).inspect(|_| {
            debug!(variable = name, "applying environment override");
        })
    };

    if let Some(url) = read(ENV_DATABASE_URL) {
        config.database.url = url;
    }
    if let Some(directory) = read(ENV_INPUT_DIRECTORY) {
        config.executor.input_directory = directory.into();
    }
    if let Some(root) = read(ENV_WORK_ROOT) {
        config.executor.work_root = root.into();
    }
    if let Some(workers) = read(ENV_WORKERS) {
        config.executor.workers = workers.trim().parse().map_err(|_| {
            ConfigError::invalid("executor", "workers", Some(workers.clone()), "not_a_number")
        })?;
    }
    if let Some(bucket) = read(ENV_UPLOAD_BUCKET) {
        config.uploader.bucket = bucket;
    }
    if let Some(level) = read(ENV_LOG_LEVEL) {
        config.logging.level = level;
    }
    if let Some(format) = read(ENV_LOG_FORMAT) {
        config.logging.format = Some(format);
    }
    Ok(())
}
