//! Per-tape working directories.

use std::path::{Path, PathBuf};

use tapemig_config::MigrationConfig;

const SANITY_CHECKER_LOG: &str = "sanity_checker.log";

/// Working paths of one tape below `work_root/<tape>`.
///
/// Every tape gets its own subtree so concurrent tapes never share a
/// slicer or linker directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapeLayout {
    root: PathBuf,
    slicer_output: PathBuf,
    linker_output: PathBuf,
    slicer_log: PathBuf,
    sanity_checker_log: PathBuf,
}

impl TapeLayout {
    /// Layout for `tape_name` using the configured subdirectory names.
    #[must_use]
    pub fn from_config(config: &MigrationConfig, tape_name: &str) -> Self {
        let root = config.executor.work_root.join(tape_name);
        let log_dir = root.join(&config.slicer.log_subdir);
        let sanity_log_name = config
            .sanity_checker
            .as_ref()
            .map_or(SANITY_CHECKER_LOG, |checker| checker.log_file_name.as_str());
        Self {
            slicer_output: root.join(&config.slicer.output_subdir),
            linker_output: root.join(&config.linker.output_subdir),
            slicer_log: log_dir.join(&config.slicer.log_file_name),
            sanity_checker_log: log_dir.join(sanity_log_name),
            root,
        }
    }

    /// Tape working root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory the slicer writes payload files into.
    #[must_use]
    pub fn slicer_output(&self) -> &Path {
        &self.slicer_output
    }

    /// Directory holding the link tree that gets uploaded.
    #[must_use]
    pub fn linker_output(&self) -> &Path {
        &self.linker_output
    }

    /// Slicer log file.
    #[must_use]
    pub fn slicer_log(&self) -> &Path {
        &self.slicer_log
    }

    /// Sanity checker log file.
    #[must_use]
    pub fn sanity_checker_log(&self) -> &Path {
        &self.sanity_checker_log
    }
}
