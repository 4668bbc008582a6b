//! # Design
//!
//! - Centralize application-level errors for bootstrap and command dispatch.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Map each failure class to a process exit code.

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded or validated.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: tapemig_config::ConfigError,
    },
    /// Logging or metrics setup failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: tapemig_telemetry::TelemetryError,
    },
    /// The relational store failed.
    #[error("data store operation failed")]
    Data {
        /// Operation identifier.
        operation: &'static str,
        /// Source data error.
        source: tapemig_data::DataError,
    },
    /// A pipeline collaborator could not be built.
    #[error("pipeline setup failed")]
    Pipeline {
        /// Operation identifier.
        operation: &'static str,
        /// Source collaborator error.
        source: tapemig_core::CoreError,
    },
    /// Link patterns could not be compiled.
    #[error("link pattern setup failed")]
    Linker {
        /// Source linker error.
        source: tapemig_linker::LinkerError,
    },
    /// The executor aborted the run.
    #[error("tape run aborted")]
    Executor {
        /// Source executor error.
        source: tapemig_pipeline::ExecutorError,
    },
}

impl AppError {
    /// Process exit code for this failure.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } | Self::Linker { .. } => 2,
            Self::Telemetry { .. } | Self::Data { .. } | Self::Pipeline { .. } => 3,
            Self::Executor { .. } => 4,
        }
    }

    pub(crate) fn config(
        operation: &'static str,
    ) -> impl FnOnce(tapemig_config::ConfigError) -> Self {
        move |source| Self::Config { operation, source }
    }

    pub(crate) fn telemetry(
        operation: &'static str,
    ) -> impl FnOnce(tapemig_telemetry::TelemetryError) -> Self {
        move |source| Self::Telemetry { operation, source }
    }

    pub(crate) fn data(operation: &'static str) -> impl FnOnce(tapemig_data::DataError) -> Self {
        move |source| Self::Data { operation, source }
    }

    pub(crate) fn pipeline(
        operation: &'static str,
    ) -> impl FnOnce(tapemig_core::CoreError) -> Self {
        move |source| Self::Pipeline { operation, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::path::PathBuf;

    #[test]
    fn helpers_build_variants_with_exit_codes() {
        let config = AppError::config("load")(tapemig_config::ConfigError::Io {
            path: PathBuf::from("/etc/tapemig.yaml"),
            source: std::io::Error::other("missing"),
        });
        assert!(matches!(config, AppError::Config { operation: "load", .. }));
        assert_eq!(config.exit_code(), 2);
        assert!(config.source().is_some());

        let pipeline = AppError::pipeline("slicer.new")(tapemig_core::CoreError::NotExecutable {
            tool: "slicer",
            executable: PathBuf::from("/opt/slicer"),
        });
        assert_eq!(pipeline.exit_code(), 3);
        assert_eq!(pipeline.to_string(), "pipeline setup failed");

        let data = AppError::data("connect")(tapemig_data::DataError::InvalidStatus {
            tape: "T1".into(),
            value: "bogus".into(),
        });
        assert_eq!(data.exit_code(), 3);
    }
}
