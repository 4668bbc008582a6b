//! Structural validation of a loaded configuration.
//!
//! # Design
//! - Reject anything that would only fail hours into a run (zero workers,
//!   empty patterns, relative tool paths).
//! - Table names are interpolated into SQL, so they must be plain identifiers.

use std::path::Path;

use crate::error::{ConfigError, ConfigResult};
use crate::model::MigrationConfig;

/// Validate a configuration document.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] describing the first offending field.
pub fn validate(config: &MigrationConfig) -> ConfigResult<()> {
    let database = &config.database;
    require_non_empty("database", "url", &database.url)?;
    require_positive("database", "max_connections", u64::from(database.max_connections))?;
    require_identifier("database", "mapping_table", &database.mapping_table)?;
    require_identifier("database", "register_table", &database.register_table)?;

    let executor = &config.executor;
    require_path("executor", "input_directory", &executor.input_directory)?;
    require_path("executor", "work_root", &executor.work_root)?;
    require_positive("executor", "workers", executor.workers as u64)?;

    let confirmer = &config.confirmer;
    if !confirmer.ready_extension.starts_with('.') || confirmer.ready_extension.len() < 2 {
        return Err(ConfigError::invalid(
            "confirmer",
            "ready_extension",
            Some(confirmer.ready_extension.clone()),
            "must_start_with_dot",
        ));
    }
    require_positive("confirmer", "timeout_secs", confirmer.timeout_secs)?;
    require_positive("confirmer", "poll_interval_secs", confirmer.poll_interval_secs)?;
    if confirmer.poll_interval_secs > confirmer.timeout_secs {
        return Err(ConfigError::invalid(
            "confirmer",
            "poll_interval_secs",
            Some(confirmer.poll_interval_secs.to_string()),
            "exceeds_timeout",
        ));
    }

    let slicer = &config.slicer;
    require_absolute("slicer", "executable", &slicer.executable)?;
    require_segment("slicer", "output_subdir", &slicer.output_subdir)?;
    require_segment("slicer", "log_subdir", &slicer.log_subdir)?;
    require_segment("slicer", "log_file_name", &slicer.log_file_name)?;

    if let Some(checker) = config.active_sanity_checker() {
        require_absolute("sanity_checker", "executable", &checker.executable)?;
        require_segment("sanity_checker", "log_file_name", &checker.log_file_name)?;
    }

    let linker = &config.linker;
    require_segment("linker", "output_subdir", &linker.output_subdir)?;
    if linker.output_subdir == slicer.output_subdir {
        return Err(ConfigError::invalid(
            "linker",
            "output_subdir",
            Some(linker.output_subdir.clone()),
            "collides_with_slicer_output",
        ));
    }
    if linker.file_patterns.is_empty() {
        return Err(ConfigError::invalid(
            "linker",
            "file_patterns",
            None,
            "must_not_be_empty",
        ));
    }
    for pattern in &linker.file_patterns {
        require_non_empty("linker", "file_patterns", pattern)?;
    }
    require_positive("linker", "workers", linker.workers as u64)?;

    require_non_empty("uploader", "bucket", &config.uploader.bucket)?;
    require_path("uploader", "aws_executable", &config.uploader.aws_executable)?;

    if let Some(format) = config.logging.format.as_deref()
        && !matches!(format, "json" | "pretty")
    {
        return Err(ConfigError::invalid(
            "logging",
            "format",
            Some(format.to_string()),
            "unknown_format",
        ));
    }
    require_non_empty("logging", "label", &config.logging.label)?;

    Ok(())
}

fn require_non_empty(section: &'static str, field: &'static str, value: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::invalid(section, field, None, "must_not_be_empty"));
    }
    Ok(())
}

fn require_positive(section: &'static str, field: &'static str, value: u64) -> ConfigResult<()> {
    if value == 0 {
        return Err(ConfigError::invalid(
            section,
            field,
            Some(value.to_string()),
            "must_be_positive",
        ));
    }
    Ok(())
}

fn require_path(section: &'static str, field: &'static str, value: &Path) -> ConfigResult<()> {
    if value.as_os_str().is_empty() {
        return Err(ConfigError::invalid(section, field, None, "must_not_be_empty"));
    }
    Ok(())
}

fn require_absolute(section: &'static str, field: &'static str, value: &Path) -> ConfigResult<()> {
    require_path(section, field, value)?;
    if !value.is_absolute() {
        return Err(ConfigError::invalid(
            section,
            field,
            Some(value.display().to_string()),
            "must_be_absolute",
        ));
    }
    Ok(())
}

fn require_segment(section: &'static str, field: &'static str, value: &str) -> ConfigResult<()> {
    require_non_empty(section, field, value)?;
    if value.contains('/') || value == "." || value == ".." {
        return Err(ConfigError::invalid(
            section,
            field,
            Some(value.to_string()),
            "must_be_single_path_segment",
        ));
    }
    Ok(())
}

fn require_identifier(section: &'static str, field: &'static str, value: &str) -> ConfigResult<()> {
    let valid = !value.is_empty()
        && value.split('.').all(|part| {
            let mut chars = part.chars();
            chars
                .next()
                .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if valid {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            section,
            field,
            Some(value.to_string()),
            "must_be_sql_identifier",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parse_config;

    type TestResult<T> = anyhow::Result<T>;

    const BASE: &str = r#"
database:
  url: postgres://tapemig@localhost/tapemig
executor:
  input_directory: /data/in
  work_root: /data/work
  workers: 2
slicer:
  executable: /opt/slicer/bin/slicer
linker:
  file_patterns: ["*.*"]
uploader:
  bucket: archive
"#;

    fn assert_invalid(config: &MigrationConfig, expected_field: &str, expected_reason: &str) {
        match validate(config) {
            Err(ConfigError::InvalidField { field, reason, .. }) => {
                assert_eq!(field, expected_field);
                assert_eq!(reason, expected_reason);
            }
            other => panic!("expected invalid {expected_field}, got {other:?}"),
        }
    }

    #[test]
    fn base_document_is_valid() -> TestResult<()> {
        validate(&parse_config(BASE)?)?;
        Ok(())
    }

    #[test]
    fn rejects_zero_workers_and_empty_patterns() -> TestResult<()> {
        let mut config = parse_config(BASE)?;
        config.executor.workers = 0;
        assert_invalid(&config, "workers", "must_be_positive");

        let mut config = parse_config(BASE)?;
        config.linker.file_patterns.clear();
        assert_invalid(&config, "file_patterns", "must_not_be_empty");

        let mut config = parse_config(BASE)?;
        config.linker.file_patterns.push("  ".into());
        assert_invalid(&config, "file_patterns", "must_not_be_empty");
        Ok(())
    }

    #[test]
    fn rejects_relative_tool_paths_and_bad_timeouts() -> TestResult<()> {
        let mut config = parse_config(BASE)?;
        config.slicer.executable = "bin/slicer".into();
        assert_invalid(&config, "executable", "must_be_absolute");

        let mut config = parse_config(BASE)?;
        config.confirmer.timeout_secs = 0;
        assert_invalid(&config, "timeout_secs", "must_be_positive");

        let mut config = parse_config(BASE)?;
        config.confirmer.poll_interval_secs = config.confirmer.timeout_secs + 1;
        assert_invalid(&config, "poll_interval_secs", "exceeds_timeout");
        Ok(())
    }

    #[test]
    fn rejects_unsafe_table_names() -> TestResult<()> {
        let mut config = parse_config(BASE)?;
        config.database.register_table = "mig_taperegister; drop table x".into();
        assert_invalid(&config, "register_table", "must_be_sql_identifier");

        let mut config = parse_config(BASE)?;
        config.database.mapping_table = "migration.mig_mapping".into();
        validate(&config)?;
        Ok(())
    }

    #[test]
    fn rejects_colliding_subdirectories_and_unknown_log_format() -> TestResult<()> {
        let mut config = parse_config(BASE)?;
        config.linker.output_subdir = "slicer".into();
        assert_invalid(&config, "output_subdir", "collides_with_slicer_output");

        let mut config = parse_config(BASE)?;
        config.logging.format = Some("xml".into());
        assert_invalid(&config, "format", "unknown_format");
        Ok(())
    }

    #[test]
    fn disabled_sanity_checker_is_not_validated() -> TestResult<()> {
        let document = format!(
            "{BASE}sanity_checker:\n  enabled: false\n  executable: relative/sanity\n"
        );
        let config = parse_config(&document)?;
        assert!(config.active_sanity_checker().is_none());
        validate(&config)?;
        Ok(())
    }
}
