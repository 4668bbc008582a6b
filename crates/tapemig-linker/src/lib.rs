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

//! Target layout derivation and link creation for sliced tapes.
//!
//! Layout:
//! - `lookup`: immutable source → destination identifier table.
//! - `transformer`: pure mapping from a sliced file to its target path.
//! - `creator`: glob-driven link pass producing per-file outcomes.

pub mod creator;
pub mod error;
pub mod lookup;
pub mod transformer;

pub use creator::{LinkCreator, LinkPatterns};
pub use error::{LinkerError, LinkerResult};
pub use lookup::NameLookupTable;
pub use transformer::{PathTransformer, RESOURCE_DIR};
