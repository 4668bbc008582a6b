//! Error types for configuration operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration file")]
    Io {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The configuration document is not valid YAML for the model.
    #[error("failed to parse configuration document")]
    Parse {
        /// Path of the configuration file, when loaded from disk.
        path: Option<PathBuf>,
        /// Underlying YAML error.
        source: serde_yaml::Error,
    },
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Section that failed validation.
        section: &'static str,
        /// Field that failed validation.
        field: &'static str,
        /// Offending value when available.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
}

impl ConfigError {
    pub(crate) fn invalid(
        section: &'static str,
        field: &'static str,
        value: Option<String>,
        reason: &'static str,
    ) -> Self {
        Self::InvalidField {
            section,
            field,
            value,
            reason,
        }
    }
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn config_error_messages_are_constant() {
        let io_err = ConfigError::Io {
            path: PathBuf::from("tapemig.yaml"),
            source: io::Error::other("missing"),
        };
        assert_eq!(io_err.to_string(), "failed to read configuration file");
        assert!(io_err.source().is_some());

        let invalid = ConfigError::invalid("executor", "workers", Some("0".into()), "must_be_positive");
        assert_eq!(invalid.to_string(), "invalid configuration field");
        assert!(invalid.source().is_none());
    }
}
