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

//! Configuration for tape migration runs.
//!
//! Layout:
//! - `model`: typed sections deserialised from YAML.
//! - `loader`: file loading and environment overrides.
//! - `validate`: structural checks run before anything touches the filesystem.
//! - `defaults`: default values referenced by serde.

mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{apply_env_overrides, load_config, parse_config};
pub use model::{
    ConfirmerConfig, DatabaseConfig, ExecutorConfig, LinkerConfig, LoggingSettings,
    MigrationConfig, SanityCheckerConfig, SlicerConfig, UploaderConfig,
};
pub use validate::validate;
