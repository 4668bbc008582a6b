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

//! Data access for tape migration: the name mapping table and the tape status register.

pub mod error;
pub mod store;

pub use error::{DataError, Result as DataResult};
pub use store::{MigrationStore, TableNames, run_migrations};
