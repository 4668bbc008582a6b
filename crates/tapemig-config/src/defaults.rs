//! Default values for optional configuration keys.
//!
//! # Design
//! - Keep every default in one place so the sample config and serde agree.

#![allow(clippy::redundant_pub_crate)]

use std::path::PathBuf;

pub(crate) const MAPPING_TABLE: &str = "mig_mapping";
pub(crate) const REGISTER_TABLE: &str = "mig_taperegister";
pub(crate) const READY_EXTENSION: &str = ".ready";
pub(crate) const SLICER_OUTPUT_SUBDIR: &str = "slicer";
pub(crate) const SLICER_LOG_SUBDIR: &str = "log";
pub(crate) const SLICER_LOG_FILE: &str = "slicer.log";
pub(crate) const SANITY_CHECKER_LOG_FILE: &str = "sanity_checker.log";
pub(crate) const LINKER_OUTPUT_SUBDIR: &str = "linker";
pub(crate) const AWS_EXECUTABLE: &str = "aws";
pub(crate) const LOG_LEVEL: &str = "info";
pub(crate) const LOG_LABEL: &str = "run";

pub(crate) const fn max_connections() -> u32 {
    5
}

pub(crate) const fn executor_workers() -> usize {
    4
}

pub(crate) const fn linker_workers() -> usize {
    1
}

pub(crate) const fn confirmer_timeout_secs() -> u64 {
    3_600
}

pub(crate) const fn confirmer_poll_interval_secs() -> u64 {
    10
}

pub(crate) const fn enabled() -> bool {
    true
}

pub(crate) fn mapping_table() -> String {
    MAPPING_TABLE.to_string()
}

pub(crate) fn register_table() -> String {
    REGISTER_TABLE.to_string()
}

pub(crate) fn ready_extension() -> String {
    READY_EXTENSION.to_string()
}

pub(crate) fn slicer_output_subdir() -> String {
    SLICER_OUTPUT_SUBDIR.to_string()
}

pub(crate) fn slicer_log_subdir() -> String {
    SLICER_LOG_SUBDIR.to_string()
}

pub(crate) fn slicer_log_file() -> String {
    SLICER_LOG_FILE.to_string()
}

pub(crate) fn sanity_checker_log_file() -> String {
    SANITY_CHECKER_LOG_FILE.to_string()
}

pub(crate) fn linker_output_subdir() -> String {
    LINKER_OUTPUT_SUBDIR.to_string()
}

pub(crate) fn aws_executable() -> PathBuf {
    PathBuf::from(AWS_EXECUTABLE)
}

pub(crate) fn log_level() -> String {
    LOG_LEVEL.to_string()
}

pub(crate) fn log_label() -> String {
    LOG_LABEL.to_string()
}
