//! Recording and scripted doubles for every collaborator trait.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tapemig_core::{
    CoreError, CoreResult, ImportConfirmer, LinkReport, Linker, MappingSource, NameLookup,
    SanityChecker, Slicer, TapeRegister, TapeStatus, TransformError, Uploader,
};

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn mentions(path: &Path, name: &str) -> bool {
    path.components()
        .any(|component| matches!(component, Component::Normal(part) if part == name))
}

/// Register that records every status write in order.
#[derive(Default)]
pub struct RecordingRegister {
    writes: Mutex<Vec<(String, TapeStatus)>>,
    fail_on: Option<TapeStatus>,
}

impl RecordingRegister {
    /// Register accepting every write.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register rejecting writes of `status` (after recording the attempt).
    #[must_use]
    pub fn failing_on(status: TapeStatus) -> Self {
        Self {
            writes: Mutex::default(),
            fail_on: Some(status),
        }
    }

    /// Every write attempted so far.
    #[must_use]
    pub fn writes(&self) -> Vec<(String, TapeStatus)> {
        lock(&self.writes).clone()
    }

    /// Statuses written for one tape, in order.
    #[must_use]
    pub fn statuses_for(&self, tape: &str) -> Vec<TapeStatus> {
        lock(&self.writes)
            .iter()
            .filter(|(name, _)| name == tape)
            .map(|(_, status)| *status)
            .collect()
    }

    /// Last status written for one tape.
    #[must_use]
    pub fn last_status(&self, tape: &str) -> Option<TapeStatus> {
        self.statuses_for(tape).last().copied()
    }
}

#[async_trait]
impl TapeRegister for RecordingRegister {
    async fn set_status(&self, tape: &str, status: TapeStatus) -> CoreResult<()> {
        lock(&self.writes).push((tape.to_string(), status));
        if self.fail_on == Some(status) {
            return Err(CoreError::store(
                "set_status",
                std::io::Error::other("register unavailable"),
            ));
        }
        Ok(())
    }
}

/// Fixed in-memory name lookup.
pub struct StaticLookup {
    table: HashMap<String, String>,
}

impl StaticLookup {
    /// Build from `(source, destination)` pairs.
    #[must_use]
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        Self {
            table: pairs
                .iter()
                .map(|(src, dst)| ((*src).to_string(), (*dst).to_string()))
                .collect(),
        }
    }
}

impl NameLookup for StaticLookup {
    fn resolve(&self, source_id: &str) -> Result<&str, TransformError> {
        self.table
            .get(source_id)
            .map(String::as_str)
            .ok_or_else(|| TransformError::MappingNotFound {
                source_id: source_id.to_string(),
            })
    }
}

/// Mapping source counting how often it is fetched.
pub struct CountingMappingSource {
    mappings: HashMap<String, String>,
    fetches: AtomicUsize,
}

impl CountingMappingSource {
    /// Build from `(source, destination)` pairs.
    #[must_use]
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        Self {
            mappings: pairs
                .iter()
                .map(|(src, dst)| ((*src).to_string(), (*dst).to_string()))
                .collect(),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Number of bulk fetches served.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MappingSource for CountingMappingSource {
    async fn fetch_mappings(&self) -> CoreResult<HashMap<String, String>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.mappings.clone())
    }
}

/// Confirmer that succeeds immediately unless the tape is scripted to time out.
pub struct ScriptedConfirmer {
    ready_extension: String,
    timeouts: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedConfirmer {
    /// Confirmer using `ready_extension` for marker paths.
    #[must_use]
    pub fn new(ready_extension: &str) -> Self {
        Self {
            ready_extension: ready_extension.to_string(),
            timeouts: HashSet::new(),
            calls: Mutex::default(),
        }
    }

    /// Script a timeout for `tape`.
    #[must_use]
    pub fn timing_out_for(mut self, tape: &str) -> Self {
        self.timeouts.insert(tape.to_string());
        self
    }

    /// Tapes the confirmer was asked about.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl ImportConfirmer for ScriptedConfirmer {
    fn confirmation_marker(&self, tape_name: &str, tape_location: &Path) -> PathBuf {
        tape_location
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(format!("{tape_name}{}", self.ready_extension))
    }

    async fn wait_for_confirmation(&self, tape_name: &str, tape_location: &Path) -> CoreResult<()> {
        lock(&self.calls).push(tape_name.to_string());
        if self.timeouts.contains(tape_name) {
            return Err(CoreError::ConfirmationTimeout {
                tape_location: tape_location.to_path_buf(),
                marker: self.confirmation_marker(tape_name, tape_location),
                waited: Duration::ZERO,
            });
        }
        Ok(())
    }
}

/// Slicer writing scripted files into the output directory.
#[derive(Default)]
pub struct ScriptedSlicer {
    outputs: Vec<String>,
    failures: HashSet<String>,
    calls: Mutex<Vec<PathBuf>>,
}

impl ScriptedSlicer {
    /// Slicer producing no files.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `names` in the output directory on every run.
    #[must_use]
    pub fn producing(mut self, names: &[&str]) -> Self {
        self.outputs = names.iter().map(|name| (*name).to_string()).collect();
        self
    }

    /// Fail when the tape image file is named `tape`.
    #[must_use]
    pub fn failing_for(mut self, tape: &str) -> Self {
        self.failures.insert(tape.to_string());
        self
    }

    /// Tape locations the slicer ran on.
    #[must_use]
    pub fn calls(&self) -> Vec<PathBuf> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl Slicer for ScriptedSlicer {
    async fn slice(
        &self,
        tape_location: &Path,
        output_directory: &Path,
        log_file: &Path,
    ) -> CoreResult<()> {
        lock(&self.calls).push(tape_location.to_path_buf());
        let tape = tape_location
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();
        if self.failures.contains(tape) {
            return Err(CoreError::ToolFailed {
                tool: "slicer",
                exit_code: Some(2),
                stderr: format!("cannot read {tape}"),
            });
        }
        fs::create_dir_all(output_directory)
            .map_err(|source| CoreError::io("slicer.mkdir", output_directory, source))?;
        if let Some(parent) = log_file.parent() {
            fs::create_dir_all(parent)
                .map_err(|source| CoreError::io("slicer.mkdir_log", parent, source))?;
        }
        fs::write(log_file, b"sliced\n")
            .map_err(|source| CoreError::io("slicer.write_log", log_file, source))?;
        for name in &self.outputs {
            let path = output_directory.join(name);
            fs::write(&path, name.as_bytes())
                .map_err(|source| CoreError::io("slicer.write_output", &path, source))?;
        }
        Ok(())
    }
}

/// Sanity checker recording the tapes it checked.
#[derive(Default)]
pub struct ScriptedSanityChecker {
    failures: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedSanityChecker {
    /// Checker accepting every tape.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject `tape`.
    #[must_use]
    pub fn failing_for(mut self, tape: &str) -> Self {
        self.failures.insert(tape.to_string());
        self
    }

    /// Tapes checked so far.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl SanityChecker for ScriptedSanityChecker {
    async fn check(
        &self,
        tape_name: &str,
        _slicer_log: &Path,
        _slicer_output_directory: &Path,
        _checker_log: &Path,
    ) -> CoreResult<()> {
        lock(&self.calls).push(tape_name.to_string());
        if self.failures.contains(tape_name) {
            return Err(CoreError::ToolFailed {
                tool: "sanity_checker",
                exit_code: Some(1),
                stderr: "object count mismatch".into(),
            });
        }
        Ok(())
    }
}

/// Uploader recording directories and counting their files.
#[derive(Default)]
pub struct ScriptedUploader {
    failures: HashSet<String>,
    calls: Mutex<Vec<PathBuf>>,
}

impl ScriptedUploader {
    /// Uploader accepting every directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail uploads of directories below a path component named `tape`.
    #[must_use]
    pub fn failing_for(mut self, tape: &str) -> Self {
        self.failures.insert(tape.to_string());
        self
    }

    /// Directories uploaded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<PathBuf> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl Uploader for ScriptedUploader {
    async fn upload_dir(&self, directory: &Path) -> CoreResult<usize> {
        lock(&self.calls).push(directory.to_path_buf());
        if self.failures.iter().any(|tape| mentions(directory, tape)) {
            return Err(CoreError::ToolFailed {
                tool: "uploader",
                exit_code: Some(255),
                stderr: "connection refused".into(),
            });
        }
        Ok(0)
    }
}

/// Linker that counts invocations and returns an empty report.
#[derive(Default)]
pub struct CountingLinker {
    calls: AtomicUsize,
    panics: bool,
}

impl CountingLinker {
    /// Fresh linker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Linker whose link pass panics, failing the task that runs it.
    #[must_use]
    pub fn panicking() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            panics: true,
        }
    }

    /// Number of link passes run.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Linker for CountingLinker {
    fn create_links(&self) -> LinkReport {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(!self.panics, "link pass aborted");
        LinkReport::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recording_register_records_failed_writes_too() {
        let register = RecordingRegister::failing_on(TapeStatus::Sliced);
        assert!(register.set_status("T1", TapeStatus::Exported).await.is_ok());
        assert!(register.set_status("T1", TapeStatus::Sliced).await.is_err());
        assert_eq!(
            register.statuses_for("T1"),
            vec![TapeStatus::Exported, TapeStatus::Sliced]
        );
        assert_eq!(register.last_status("T2"), None);
    }

    #[test]
    fn confirmer_marker_sits_next_to_tape() {
        let confirmer = ScriptedConfirmer::new(".ready");
        assert_eq!(
            confirmer.confirmation_marker("T1", Path::new("/in/T1")),
            PathBuf::from("/in/T1.ready")
        );
    }

    #[test]
    fn mentions_matches_whole_components() {
        assert!(mentions(Path::new("/work/T1/linker"), "T1"));
        assert!(!mentions(Path::new("/work/T10/linker"), "T1"));
    }

    #[test]
    fn counting_linker_counts_passes() {
        let linker = CountingLinker::new();
        assert!(linker.create_links().is_empty());
        assert!(linker.create_links().is_empty());
        assert_eq!(linker.calls(), 2);
    }
}
