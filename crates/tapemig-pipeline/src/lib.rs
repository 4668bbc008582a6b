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

//! Tape migration pipeline.
//!
//! Layout:
//! - `confirmer`: waits for a tape image and its ready marker.
//! - `tools`: slicer and sanity-checker subprocess adapters.
//! - `uploader`: AWS CLI backed object storage upload.
//! - `cleanup`: path deletion used after upload and at the end of a tape.
//! - `layout`: per-tape working directories below the work root.
//! - `processor`: the ordered, fail-fast unit of work for one tape.
//! - `factory`: builds one processor per tape from shared collaborators.
//! - `executor`: discovers tapes and runs them on a bounded worker pool.

pub mod cleanup;
pub mod confirmer;
pub mod error;
pub mod executor;
pub mod factory;
pub mod layout;
pub mod processor;
pub mod tools;
pub mod uploader;

pub use cleanup::{delete_path, spawn_delete};
pub use confirmer::TapeImportConfirmer;
pub use error::{ExecutorError, ExecutorResult};
pub use executor::ParallelTapeExecutor;
pub use factory::UnitOfWorkFactory;
pub use layout::TapeLayout;
pub use processor::{Collaborators, StageDurations, UnitOfWorkProcessor};
pub use tools::{CommandSanityChecker, CommandSlicer};
pub use uploader::AwsCliUploader;
