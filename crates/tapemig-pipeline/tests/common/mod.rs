#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tapemig_config::{MigrationConfig, parse_config};
use tapemig_core::{Linker, NameLookup, SanityChecker, Slicer};
use tapemig_events::{Event, EventBus};
use tapemig_pipeline::{Collaborators, TapeLayout, UnitOfWorkFactory, UnitOfWorkProcessor};
use tapemig_telemetry::Metrics;
use tapemig_test_support::fixtures::touch;
use tapemig_test_support::mocks::{
    RecordingRegister, ScriptedConfirmer, ScriptedSanityChecker, ScriptedSlicer, ScriptedUploader,
    StaticLookup,
};
use tempfile::TempDir;

pub const SLICED_FILES: &[&str] = &["AAG.L123.FAAA", "AAG.L123", "broken"];

pub struct Harness {
    pub root: TempDir,
    pub config: Arc<MigrationConfig>,
    pub register: Arc<RecordingRegister>,
    pub confirmer: Arc<ScriptedConfirmer>,
    pub slicer: Arc<ScriptedSlicer>,
    pub checker: Option<Arc<ScriptedSanityChecker>>,
    pub uploader: Arc<ScriptedUploader>,
    pub events: EventBus,
    pub metrics: Metrics,
}

pub struct HarnessBuilder {
    register: RecordingRegister,
    confirmer: ScriptedConfirmer,
    slicer: ScriptedSlicer,
    checker: Option<ScriptedSanityChecker>,
    uploader: ScriptedUploader,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            register: RecordingRegister::new(),
            confirmer: ScriptedConfirmer::new(".ready"),
            slicer: ScriptedSlicer::new().producing(SLICED_FILES),
            checker: Some(ScriptedSanityChecker::new()),
            uploader: ScriptedUploader::new(),
        }
    }

    pub fn register(mut self, register: RecordingRegister) -> Self {
        self.register = register;
        self
    }

    pub fn confirmer(mut self, confirmer: ScriptedConfirmer) -> Self {
        self.confirmer = confirmer;
        self
    }

    pub fn slicer(mut self, slicer: ScriptedSlicer) -> Self {
        self.slicer = slicer;
        self
    }

    pub fn checker(mut self, checker: Option<ScriptedSanityChecker>) -> Self {
        self.checker = checker;
        self
    }

    pub fn uploader(mut self, uploader: ScriptedUploader) -> Self {
        self.uploader = uploader;
        self
    }

    pub fn build(self) -> Result<Harness> {
        let root = tempfile::Builder::new().prefix("tapemig-pipeline-").tempdir()?;
        std::fs::create_dir_all(root.path().join("in"))?;
        let document = format!(
            r"
database:
  url: postgres://localhost/tapemig
executor:
  input_directory: {input}
  workers: 2
  work_root: {work}
slicer:
  executable: /opt/slicer/bin/slicer
linker:
  file_patterns: ['*']
uploader:
  bucket: archive
",
            input = root.path().join("in").display(),
            work = root.path().join("work").display(),
        );
        Ok(Harness {
            config: Arc::new(parse_config(&document)?),
            root,
            register: Arc::new(self.register),
            confirmer: Arc::new(self.confirmer),
            slicer: Arc::new(self.slicer),
            checker: self.checker.map(Arc::new),
            uploader: Arc::new(self.uploader),
            events: EventBus::new(),
            metrics: Metrics::new()?,
        })
    }
}

impl Harness {
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            register: self.register.clone(),
            confirmer: self.confirmer.clone(),
            slicer: Arc::clone(&self.slicer) as Arc<dyn Slicer>,
            sanity_checker: self
                .checker
                .as_ref()
                .map(|checker| Arc::clone(checker) as Arc<dyn SanityChecker>),
            uploader: self.uploader.clone(),
            events: self.events.clone(),
            metrics: self.metrics.clone(),
        }
    }

    pub fn factory(&self) -> Result<UnitOfWorkFactory> {
        let lookup: Arc<dyn NameLookup> = Arc::new(StaticLookup::new(&[("AAG", "SFB")]));
        Ok(UnitOfWorkFactory::new(
            Arc::clone(&self.config),
            self.collaborators(),
            lookup,
        )?)
    }

    /// Processor for `tape` whose link stage is `linker`.
    pub fn processor_with_linker(&self, tape: &str, linker: Arc<dyn Linker>) -> UnitOfWorkProcessor {
        UnitOfWorkProcessor::new(
            self.collaborators(),
            linker,
            TapeLayout::from_config(&self.config, tape),
        )
    }

    pub fn input_dir(&self) -> PathBuf {
        self.root.path().join("in")
    }

    /// Drop a tape image plus its ready marker into the input directory.
    pub fn stage_tape(&self, name: &str) -> Result<PathBuf> {
        let location = self.input_dir().join(name);
        touch(&location)?;
        touch(&self.input_dir().join(format!("{name}.ready")))?;
        Ok(location)
    }

    pub fn events_for(&self, tape: &str) -> Vec<Event> {
        self.events
            .backlog_for_tape(tape)
            .into_iter()
            .map(|envelope| envelope.event)
            .collect()
    }

    pub fn work_dir(&self, tape: &str) -> PathBuf {
        self.root.path().join("work").join(tape)
    }
}

pub fn exists(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}
