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
#![allow(clippy::multiple_crate_versions)]

//! Binary entrypoint for the tape migration tool.

use std::process;

use clap::Parser;
use tapemig_app::{Cli, run_app};
use tapemig_core::error_chain;

/// Parses arguments, runs the selected command and maps failures to exit codes.
#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run_app(cli).await {
        eprintln!("error: {}", error_chain(&err));
        process::exit(err.exit_code());
    }
}
