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
#![allow(clippy::missing_panics_doc)]

//! Shared test helpers used across integration suites.
//! Layout: fixtures.rs (filesystem/env helpers), postgres.rs (docker-backed database), mocks.rs (collaborator doubles).

pub mod fixtures;
pub mod mocks;
pub mod postgres;
