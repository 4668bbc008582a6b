//! Errors that escape the executor.
//!
//! Per-tape failures never surface here; they end as a `FAILED` register row.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tokio::task::JoinError;

/// Result type for executor runs.
pub type ExecutorResult<T> = Result<T, ExecutorError>;

/// Failures that halt a whole executor run.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The input directory could not be listed.
    #[error("tape discovery failed")]
    Discovery {
        /// Directory being listed.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// A worker task panicked or was cancelled.
    #[error("executor worker terminated abnormally")]
    WorkerPanicked {
        /// Join failure reported by the runtime.
        source: JoinError,
    },
}
