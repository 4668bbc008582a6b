#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions, clippy::multiple_crate_versions)]

//! Domain model and collaborator contracts shared by the tape migration crates.
//!
//! Layout:
//! - `model`: tape status lifecycle, pipeline stages, path shapes and link outcomes.
//! - `service`: traits implemented by adapters (store, tools, linker) and test doubles.
//! - `error`: error taxonomy for collaborators, transforms, links and stages.

pub mod error;
pub mod model;
pub mod service;

pub use error::{CoreError, CoreResult, LinkError, StageError, TransformError, error_chain};
pub use model::{
    LinkMode, LinkOutcome, LinkReport, LinkTask, PathShape, PipelineStage, RunSummary, TapeStatus,
    UnknownTapeStatus,
};
pub use service::{
    ImportConfirmer, Linker, MappingSource, NameLookup, SanityChecker, Slicer, TapeRegister,
    Uploader,
};
