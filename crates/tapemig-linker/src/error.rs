//! Errors raised while building a link pass.

use thiserror::Error;

/// Result type for link pass construction.
pub type LinkerResult<T> = Result<T, LinkerError>;

/// Errors produced before any link is attempted.
#[derive(Debug, Error)]
pub enum LinkerError {
    /// A file pattern failed to compile.
    #[error("invalid link file pattern")]
    InvalidPattern {
        /// Offending pattern.
        pattern: String,
        /// Underlying globset error.
        source: globset::Error,
    },
    /// The pattern list was empty.
    #[error("no link file patterns configured")]
    NoPatterns,
}
