//! Domain types for the tape migration pipeline.
//!
//! # Design
//! - Pure data carriers; no IO happens here.
//! - String forms of `TapeStatus` are the values persisted in the tape register.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LinkError;

/// Lifecycle status persisted per tape.
///
/// Forward order is `New → Requested → Exported → Sliced → Sanitized → Linked →
/// Finished`; `Failed` is reachable from any in-progress state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TapeStatus {
    /// Tape registered for migration.
    New,
    /// Tape export requested from the archive.
    Requested,
    /// Tape image landed on disk and was confirmed.
    Exported,
    /// Slicer extracted the payload files.
    Sliced,
    /// Sanity checker accepted the slicer output.
    Sanitized,
    /// Target link tree was created.
    Linked,
    /// Link tree uploaded; the tape is done.
    Finished,
    /// A stage failed; the tape will not progress further.
    Failed,
    /// Tape claimed by an operator tool outside the pipeline.
    InProgress,
}

impl TapeStatus {
    /// Value stored in the register's status column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Requested => "requested",
            Self::Exported => "exported",
            Self::Sliced => "sliced",
            Self::Sanitized => "sanitized",
            Self::Linked => "linked",
            Self::Finished => "finished",
            Self::Failed => "failed",
            Self::InProgress => "in progress",
        }
    }
}

impl Display for TapeStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored status string is not a known [`TapeStatus`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tape status")]
pub struct UnknownTapeStatus {
    /// Offending value.
    pub value: String,
}

impl FromStr for TapeStatus {
    type Err = UnknownTapeStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "new" => Ok(Self::New),
            "requested" => Ok(Self::Requested),
            "exported" => Ok(Self::Exported),
            "sliced" => Ok(Self::Sliced),
            "sanitized" => Ok(Self::Sanitized),
            "linked" => Ok(Self::Linked),
            "finished" => Ok(Self::Finished),
            "failed" => Ok(Self::Failed),
            "in progress" => Ok(Self::InProgress),
            other => Err(UnknownTapeStatus {
                value: other.to_string(),
            }),
        }
    }
}

/// Fixed stage order of the per-tape pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Wait for the tape image and its ready marker.
    Confirm,
    /// Run the slicing tool over the tape image.
    Slice,
    /// Run the sanity-check tool over the slicer output.
    SanityCheck,
    /// Derive the target layout and create links.
    Link,
    /// Upload the linked tree.
    Upload,
    /// Remove working directories, the tape image and its marker.
    Cleanup,
}

impl PipelineStage {
    /// Label used in logs, metrics and events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Confirm => "confirm",
            Self::Slice => "slice",
            Self::SanityCheck => "sanity_check",
            Self::Link => "link",
            Self::Upload => "upload",
            Self::Cleanup => "cleanup",
        }
    }

    /// Status written to the register once the stage succeeds.
    #[must_use]
    pub const fn completion_status(self) -> Option<TapeStatus> {
        match self {
            Self::Confirm => Some(TapeStatus::Exported),
            Self::Slice => Some(TapeStatus::Sliced),
            Self::SanityCheck => Some(TapeStatus::Sanitized),
            Self::Link => Some(TapeStatus::Linked),
            Self::Upload => Some(TapeStatus::Finished),
            Self::Cleanup => None,
        }
    }
}

impl Display for PipelineStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File name shapes produced by the slicer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathShape<'a> {
    /// `{src}.{load_id}.{suffix}`
    Object {
        /// Source collection identifier.
        src: &'a str,
        /// Load identifier; its first character is a legacy prefix.
        load_id: &'a str,
        /// Object suffix; its first three characters form the bucket.
        suffix: &'a str,
    },
    /// `{src}.{load_id}`
    Resource {
        /// Source collection identifier.
        src: &'a str,
        /// Load identifier; its first character is a legacy prefix.
        load_id: &'a str,
    },
}

impl<'a> PathShape<'a> {
    /// Classify a bare file name by its dot-separated components.
    ///
    /// Returns the component count on failure so callers can report it.
    pub fn classify(file_name: &'a str) -> Result<Self, usize> {
        let parts: Vec<&str> = file_name.split('.').collect();
        match *parts.as_slice() {
            [src, load_id, suffix] => Ok(Self::Object {
                src,
                load_id,
                suffix,
            }),
            [src, load_id] => Ok(Self::Resource { src, load_id }),
            _ => Err(parts.len()),
        }
    }

    /// Source collection identifier for either shape.
    #[must_use]
    pub const fn src(&self) -> &'a str {
        match self {
            Self::Object { src, .. } | Self::Resource { src, .. } => *src,
        }
    }
}

/// How link targets point at the sliced files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkMode {
    /// Hard link; the target shares the source inode.
    #[default]
    Hard,
    /// Symbolic link pointing at the source path.
    Symbolic,
}

impl LinkMode {
    /// Label used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hard => "hard",
            Self::Symbolic => "symbolic",
        }
    }
}

/// One link to create, derived from the transformer output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTask {
    /// Sliced file the link points at.
    pub source_file: PathBuf,
    /// Path of the link to create.
    pub target_path: PathBuf,
}

/// Result of one link attempt.
#[derive(Debug)]
pub enum LinkOutcome {
    /// The link was created at `target`.
    Linked {
        /// Path of the created link.
        target: PathBuf,
    },
    /// The link was not created.
    Failed(LinkError),
}

impl LinkOutcome {
    /// Whether the link was created.
    #[must_use]
    pub const fn is_linked(&self) -> bool {
        matches!(self, Self::Linked { .. })
    }

    /// Failure detail, when the attempt failed.
    #[must_use]
    pub const fn error(&self) -> Option<&LinkError> {
        match self {
            Self::Linked { .. } => None,
            Self::Failed(err) => Some(err),
        }
    }
}

/// Per-source-file outcomes of one link pass.
#[derive(Debug, Default)]
pub struct LinkReport {
    outcomes: BTreeMap<PathBuf, LinkOutcome>,
}

impl LinkReport {
    /// Record the outcome for a source file, replacing any earlier entry.
    pub fn record(&mut self, source: PathBuf, outcome: LinkOutcome) {
        self.outcomes.insert(source, outcome);
    }

    /// Outcome for a single source file.
    #[must_use]
    pub fn get(&self, source: &Path) -> Option<&LinkOutcome> {
        self.outcomes.get(source)
    }

    /// Iterate outcomes ordered by source path.
    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &LinkOutcome)> {
        self.outcomes.iter()
    }

    /// Number of source files attempted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Whether no source file matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Number of links created.
    #[must_use]
    pub fn linked_count(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_linked()).count()
    }

    /// Number of failed attempts.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.len() - self.linked_count()
    }

    /// Failed attempts with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (&PathBuf, &LinkError)> {
        self.outcomes
            .iter()
            .filter_map(|(path, outcome)| outcome.error().map(|err| (path, err)))
    }
}

/// What the executor did with the input directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Tape files found in the input directory.
    pub discovered: usize,
    /// Tapes handed to a worker.
    pub dispatched: usize,
}
