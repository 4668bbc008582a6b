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
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions, clippy::multiple_crate_versions)]

//! Tape migration application wiring.
//!
//! Layout: `cli.rs` (argument parsing), `bootstrap.rs` (service wiring and
//! command dispatch), `error.rs` (application error and exit codes).

/// Application bootstrap and command dispatch.
pub mod bootstrap;
/// Command line definition.
pub mod cli;
/// Application error type.
pub mod error;

pub use bootstrap::run_app;
pub use cli::{Cli, Command};
pub use error::{AppError, AppResult};
