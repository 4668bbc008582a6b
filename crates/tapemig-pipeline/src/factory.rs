//! Builds one unit of work per tape.

use std::sync::Arc;

use tapemig_config::MigrationConfig;
use tapemig_core::NameLookup;
use tapemig_linker::{LinkCreator, LinkPatterns, LinkerResult, PathTransformer};

use crate::layout::TapeLayout;
use crate::processor::{Collaborators, UnitOfWorkProcessor};

/// Shares collaborators and the lookup table across per-tape processors.
#[derive(Clone)]
pub struct UnitOfWorkFactory {
    config: Arc<MigrationConfig>,
    collaborators: Collaborators,
    transformer: PathTransformer,
    patterns: LinkPatterns,
}

impl UnitOfWorkFactory {
    /// Compile the link patterns once and keep everything a processor needs.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured link file patterns do not compile.
    pub fn new(
        config: Arc<MigrationConfig>,
        collaborators: Collaborators,
        lookup: Arc<dyn NameLookup>,
    ) -> LinkerResult<Self> {
        let patterns = LinkPatterns::new(&config.linker.file_patterns)?;
        Ok(Self {
            config,
            collaborators,
            transformer: PathTransformer::new(lookup),
            patterns,
        })
    }

    /// Collaborators handed to every processor.
    #[must_use]
    pub const fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Processor for `tape_name` with its own working layout and link pass.
    #[must_use]
    pub fn create(&self, tape_name: &str) -> UnitOfWorkProcessor {
        let layout = TapeLayout::from_config(&self.config, tape_name);
        let linker = LinkCreator::new(
            layout.slicer_output(),
            layout.linker_output(),
            self.patterns.clone(),
            self.transformer.clone(),
            self.config.linker.link_mode,
        )
        .with_workers(self.config.linker.workers);
        UnitOfWorkProcessor::new(self.collaborators.clone(), Arc::new(linker), layout)
    }
}
