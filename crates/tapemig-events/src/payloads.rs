//! Event payload types emitted while tapes move through the pipeline.

use chrono::{DateTime, Utc};

/// Identifier assigned to each event emitted on the bus.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
pub const DEFAULT_REPLAY_CAPACITY: usize = 1_024;

/// Typed domain events surfaced by the migration pipeline.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A unit of work was started for a tape.
    TapeStarted {
        /// Tape volume identifier.
        tape: String,
        /// Location of the tape image on disk.
        location: String,
    },
    /// A pipeline stage began for a tape.
    StageStarted {
        /// Tape volume identifier.
        tape: String,
        /// Stage label.
        stage: String,
    },
    /// A pipeline stage finished successfully.
    StageCompleted {
        /// Tape volume identifier.
        tape: String,
        /// Stage label.
        stage: String,
        /// Wall-clock duration of the stage in milliseconds.
        duration_ms: u64,
    },
    /// A pipeline stage failed; the tape will not progress further.
    StageFailed {
        /// Tape volume identifier.
        tape: String,
        /// Stage label.
        stage: String,
        /// Rendered error chain.
        message: String,
    },
    /// Link creation finished for a tape.
    LinksCreated {
        /// Tape volume identifier.
        tape: String,
        /// Links created successfully.
        linked: usize,
        /// Files whose link attempt failed.
        failed: usize,
    },
    /// A tape reached the finished state.
    TapeFinished {
        /// Tape volume identifier.
        tape: String,
        /// Total pipeline duration in milliseconds.
        duration_ms: u64,
    },
    /// A tape reached the failed state.
    TapeFailed {
        /// Tape volume identifier.
        tape: String,
        /// Stage that failed.
        stage: String,
    },
    /// The executor drained its queue.
    RunCompleted {
        /// Tapes discovered in the input directory.
        discovered: usize,
        /// Tapes handed to a worker.
        dispatched: usize,
    },
}

impl Event {
    /// Machine-friendly discriminator for log and metric labels.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::TapeStarted { .. } => "tape_started",
            Self::StageStarted { .. } => "stage_started",
            Self::StageCompleted { .. } => "stage_completed",
            Self::StageFailed { .. } => "stage_failed",
            Self::LinksCreated { .. } => "links_created",
            Self::TapeFinished { .. } => "tape_finished",
            Self::TapeFailed { .. } => "tape_failed",
            Self::RunCompleted { .. } => "run_completed",
        }
    }

    /// Tape the event refers to, when it is tape scoped.
    #[must_use]
    pub fn tape(&self) -> Option<&str> {
        match self {
            Self::TapeStarted { tape, .. }
            | Self::StageStarted { tape, .. }
            | Self::StageCompleted { tape, .. }
            | Self::StageFailed { tape, .. }
            | Self::LinksCreated { tape, .. }
            | Self::TapeFinished { tape, .. }
            | Self::TapeFailed { tape, .. } => Some(tape),
            Self::RunCompleted { .. } => None,
        }
    }
}

/// Event envelope carrying the id and timestamp alongside the payload.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct EventEnvelope {
    /// Sequential identifier assigned by the bus.
    pub id: EventId,
    /// Time the event was published.
    pub timestamp: DateTime<Utc>,
    /// Event payload.
    pub event: Event,
}
