//! Glob-driven link creation over a slicer output directory.
//!
//! # Design
//! - Every matched file yields exactly one entry in the [`LinkReport`]; the pass
//!   as a whole never fails.
//! - Existing targets are reported as [`LinkError::AlreadyExists`] and left
//!   untouched.
//! - Parent creation and the existence check run under one mutex so two files
//!   racing for the same target cannot both pass the check.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tapemig_core::{LinkError, LinkMode, LinkOutcome, LinkReport, LinkTask, Linker};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{LinkerError, LinkerResult};
use crate::transformer::PathTransformer;

/// Links every matching sliced file into the target layout.
#[derive(Debug)]
pub struct LinkCreator {
    source_dir: PathBuf,
    target_base: PathBuf,
    patterns: LinkPatterns,
    transformer: PathTransformer,
    mode: LinkMode,
    workers: usize,
    prepare_lock: Mutex<()>,
}

impl LinkCreator {
    /// Build a single-threaded link pass.
    #[must_use]
    pub fn new(
        source_dir: impl Into<PathBuf>,
        target_base: impl Into<PathBuf>,
        patterns: LinkPatterns,
        transformer: PathTransformer,
        mode: LinkMode,
    ) -> Self {
        Self {
            source_dir: source_dir.into(),
            target_base: target_base.into(),
            patterns,
            transformer,
            mode,
            workers: 1,
            prepare_lock: Mutex::new(()),
        }
    }

    /// Spread link attempts over `workers` threads (minimum one).
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Directory searched for sliced files.
    #[must_use]
    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Root of the link target layout.
    #[must_use]
    pub fn target_base(&self) -> &Path {
        &self.target_base
    }

    fn matching_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.source_dir).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(
                        source_dir = %self.source_dir.display(),
                        error = %err,
                        "skipping unreadable entry while collecting link sources"
                    );
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.source_dir) else {
                continue;
            };
            if self.patterns.matches(relative) {
                files.push(entry.into_path());
            }
        }
        files
    }

    fn link_all(&self, files: Vec<PathBuf>) -> LinkReport {
        let mut report = LinkReport::default();
        if self.workers <= 1 || files.len() <= 1 {
            for source in files {
                let outcome = self.link_one(&source);
                report.record(source, outcome);
            }
            return report;
        }

        let chunk_size = files.len().div_ceil(self.workers);
        thread::scope(|scope| {
            let handles: Vec<_> = files
                .chunks(chunk_size)
                .map(|chunk| {
                    (
                        chunk,
                        scope.spawn(move || {
                            chunk
                                .iter()
                                .map(|source| (source.clone(), self.link_one(source)))
                                .collect::<Vec<_>>()
                        }),
                    )
                })
                .collect();
            for (chunk, handle) in handles {
                if let Ok(outcomes) = handle.join() {
                    for (source, outcome) in outcomes {
                        report.record(source, outcome);
                    }
                } else {
                    warn!(files = chunk.len(), "link worker panicked");
                    for source in chunk {
                        report.record(
                            source.clone(),
                            LinkOutcome::Failed(LinkError::io(
                                "link.worker",
                                source,
                                io::Error::other("link worker panicked"),
                            )),
                        );
                    }
                }
            }
        });
        report
    }

    fn link_one(&self, source: &Path) -> LinkOutcome {
        let outcome = match self.transformer.task(source, &self.target_base) {
            Ok(task) => self.create_link(&task),
            Err(err) => Err(LinkError::from(err)),
        };
        match outcome {
            Ok(target) => {
                debug!(
                    source = %source.display(),
                    target = %target.display(),
                    mode = self.mode.as_str(),
                    "link created"
                );
                LinkOutcome::Linked { target }
            }
            Err(err) => {
                warn!(
                    source = %source.display(),
                    kind = err.kind(),
                    error = %tapemig_core::error_chain(&err),
                    "link failed"
                );
                LinkOutcome::Failed(err)
            }
        }
    }

    fn create_link(&self, task: &LinkTask) -> Result<PathBuf, LinkError> {
        let target = &task.target_path;
        {
            let _guard = self
                .prepare_lock
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .map_err(|err| LinkError::io("link.create_parent", parent, err))?;
            }
            if target.symlink_metadata().is_ok() {
                return Err(LinkError::AlreadyExists {
                    target: target.clone(),
                });
            }
        }

        let result = match self.mode {
            LinkMode::Hard => fs::hard_link(&task.source_file, target),
            LinkMode::Symbolic => symlink(&task.source_file, target),
        };
        match result {
            Ok(()) => Ok(target.clone()),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                Err(LinkError::AlreadyExists {
                    target: target.clone(),
                })
            }
            Err(err) => Err(LinkError::io("link.create", target, err)),
        }
    }
}

impl Linker for LinkCreator {
    fn create_links(&self) -> LinkReport {
        let files = self.matching_files();
        let report = self.link_all(files);
        info!(
            source_dir = %self.source_dir.display(),
            target_base = %self.target_base.display(),
            matched = report.len(),
            linked = report.linked_count(),
            failed = report.failed_count(),
            "link pass finished"
        );
        report
    }
}

#[cfg(unix)]
fn symlink(source: &Path, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(source, target)
}

#[cfg(not(unix))]
fn symlink(_source: &Path, _target: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symbolic links are only supported on unix",
    ))
}

/// Compiled file patterns selecting which sliced files get linked.
///
/// Patterns match paths relative to the source directory; `*` does not cross
/// directory separators, `**` does. A file matched by several patterns is
/// still linked once.
#[derive(Debug, Clone)]
pub struct LinkPatterns {
    set: GlobSet,
}

impl LinkPatterns {
    /// Compile `patterns` into one matcher.
    ///
    /// # Errors
    ///
    /// Returns an error when `patterns` is empty or a pattern fails to compile.
    pub fn new(patterns: &[String]) -> LinkerResult<Self> {
        if patterns.is_empty() {
            return Err(LinkerError::NoPatterns);
        }
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map_err(|source| LinkerError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|source| LinkerError::InvalidPattern {
            pattern: "<set>".to_string(),
            source,
        })?;
        Ok(Self { set })
    }

    /// Whether `relative` is selected by any pattern.
    #[must_use]
    pub fn matches(&self, relative: &Path) -> bool {
        self.set.is_match(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tapemig_test_support::fixtures::touch;
    use tapemig_test_support::mocks::StaticLookup;

    fn creator(source: &Path, target: &Path, patterns: &[&str]) -> anyhow::Result<LinkCreator> {
        let transformer = PathTransformer::new(Arc::new(StaticLookup::new(&[("AAG", "SFB")])));
        let patterns: Vec<String> = patterns.iter().map(ToString::to_string).collect();
        Ok(LinkCreator::new(
            source,
            target,
            LinkPatterns::new(&patterns)?,
            transformer,
            LinkMode::Hard,
        ))
    }

    #[test]
    fn empty_pattern_list_is_rejected() {
        let err = LinkPatterns::new(&[]).expect_err("no patterns");
        assert!(matches!(err, LinkerError::NoPatterns));
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = LinkPatterns::new(&["[".to_string()]).expect_err("bad glob");
        assert!(matches!(err, LinkerError::InvalidPattern { pattern, .. } if pattern == "["));
    }

    #[test]
    fn patterns_respect_separators() -> anyhow::Result<()> {
        let shallow = LinkPatterns::new(&["*.*".to_string()])?;
        assert!(shallow.matches(Path::new("AAG.L1")));
        assert!(!shallow.matches(Path::new("sub/AAG.L1")));
        let deep = LinkPatterns::new(&["**/*".to_string()])?;
        assert!(deep.matches(Path::new("sub/AAG.L1")));
        Ok(())
    }

    #[test]
    fn overlapping_patterns_match_each_file_once() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let source = root.path().join("src");
        touch(&source.join("AAG.L1.FAAA"))?;
        touch(&source.join("nested/AAG.L2"))?;

        let creator = creator(&source, &root.path().join("out"), &["*", "*.*", "**/*"])?;
        let files = creator.matching_files();
        assert_eq!(files.len(), 2);
        Ok(())
    }

    #[test]
    fn single_star_does_not_descend() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let source = root.path().join("src");
        touch(&source.join("AAG.L1.FAAA"))?;
        touch(&source.join("nested/AAG.L2"))?;

        let creator = creator(&source, &root.path().join("out"), &["*"])?;
        assert_eq!(creator.matching_files(), vec![source.join("AAG.L1.FAAA")]);
        Ok(())
    }

    #[test]
    fn missing_source_directory_yields_empty_report() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let creator = creator(&root.path().join("absent"), &root.path().join("out"), &["*"])?;
        assert!(creator.create_links().is_empty());
        Ok(())
    }

    #[test]
    fn workers_are_clamped() -> anyhow::Result<()> {
        let creator = creator(Path::new("a"), Path::new("b"), &["*"])?.with_workers(0);
        assert_eq!(creator.workers, 1);
        assert_eq!(creator.source_dir(), Path::new("a"));
        assert_eq!(creator.target_base(), Path::new("b"));
        Ok(())
    }
}
