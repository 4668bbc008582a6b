//! # Design
//!
//! - Provide structured, constant-message errors for the migration pipeline.
//! - Capture operation context (paths, tools, tapes) as fields rather than in messages.
//! - Keep per-file link failures as values so a bad file never aborts a batch.

use std::error::Error;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::model::PipelineStage;

/// Result type for collaborator operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Failures while deriving a target path from a sliced file.
#[derive(Debug, Error)]
pub enum TransformError {
    /// File name is neither an object nor a resource shape.
    #[error("unsupported path shape")]
    UnsupportedPath {
        /// Offending source path.
        path: PathBuf,
        /// Number of dot-separated components in the file name.
        components: usize,
    },
    /// No destination identifier is mapped for the source identifier.
    #[error("no destination mapping for source identifier")]
    MappingNotFound {
        /// Source identifier that was looked up.
        source_id: String,
    },
}

/// Failures of a single link attempt.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The target path exists already; it is never overwritten.
    #[error("link target already exists")]
    AlreadyExists {
        /// Existing target path.
        target: PathBuf,
    },
    /// The target path could not be derived.
    #[error("link target could not be derived")]
    Transform {
        /// Underlying transform failure.
        #[from]
        source: TransformError,
    },
    /// Filesystem failure while preparing or creating the link.
    #[error("link io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
}

impl LinkError {
    /// Build an IO failure with operation context.
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Short label used for metrics and summaries.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::AlreadyExists { .. } => "already_exists",
            Self::Transform {
                source: TransformError::UnsupportedPath { .. },
            } => "unsupported_path",
            Self::Transform {
                source: TransformError::MappingNotFound { .. },
            } => "mapping_not_found",
            Self::Io { .. } => "io",
        }
    }
}

/// Errors produced by pipeline collaborators (tools, store, confirmer, cleanup).
#[derive(Debug, Error)]
pub enum CoreError {
    /// The tape image or its ready marker did not appear in time.
    #[error("tape import confirmation timed out")]
    ConfirmationTimeout {
        /// Tape image path that was polled.
        tape_location: PathBuf,
        /// Ready marker path that was polled.
        marker: PathBuf,
        /// How long the confirmer waited.
        waited: Duration,
    },
    /// Tool path is missing or lacks execute permission.
    #[error("external tool is not executable")]
    NotExecutable {
        /// Tool label.
        tool: &'static str,
        /// Configured executable path.
        executable: PathBuf,
    },
    /// Tool process could not be started or awaited.
    #[error("external tool could not be started")]
    ToolSpawn {
        /// Tool label.
        tool: &'static str,
        /// Executable that was invoked.
        executable: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Tool exited unsuccessfully.
    #[error("external tool failed")]
    ToolFailed {
        /// Tool label.
        tool: &'static str,
        /// Exit code, absent when the tool was killed by a signal.
        exit_code: Option<i32>,
        /// Captured standard error.
        stderr: String,
    },
    /// A stage precondition on the filesystem was not met.
    #[error("stage precondition not met")]
    Precondition {
        /// Static reason for the failure.
        reason: &'static str,
        /// Path that failed the precondition.
        path: PathBuf,
    },
    /// Filesystem failure outside the link loop.
    #[error("pipeline io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The relational store rejected an operation.
    #[error("store operation failed")]
    Store {
        /// Store operation identifier.
        operation: &'static str,
        /// Underlying store failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A background task panicked or was cancelled.
    #[error("background task failed")]
    Task {
        /// Operation the task was running.
        operation: &'static str,
        /// Underlying join failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl CoreError {
    /// Build an IO failure with operation context.
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Wrap a store failure.
    pub fn store(operation: &'static str, source: impl Error + Send + Sync + 'static) -> Self {
        Self::Store {
            operation,
            source: Box::new(source),
        }
    }
}

/// A collaborator failure attributed to the stage that ran it.
#[derive(Debug, Error)]
#[error("pipeline stage failed")]
pub struct StageError {
    /// Stage that failed.
    pub stage: PipelineStage,
    /// Underlying collaborator failure.
    #[source]
    pub source: CoreError,
}

impl StageError {
    /// Attribute a collaborator failure to a stage.
    #[must_use]
    pub const fn new(stage: PipelineStage, source: CoreError) -> Self {
        Self { stage, source }
    }
}

/// Render an error and its source chain on one line (`outer: inner: root`).
#[must_use]
pub fn error_chain(err: &(dyn Error + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut current = err.source();
    while let Some(source) = current {
        rendered.push_str(": ");
        rendered.push_str(&source.to_string());
        current = source.source();
    }
    rendered
}
