//! Collaborator contracts consumed by the pipeline.
//!
//! Each trait has one production adapter and one test double; the pipeline only
//! ever sees these seams.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{CoreResult, TransformError};
use crate::model::{LinkReport, TapeStatus};

/// Resolves source collection identifiers to destination identifiers.
///
/// Implementations are immutable after construction and safe to share.
pub trait NameLookup: Send + Sync {
    /// Destination identifier for `source_id`.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::MappingNotFound`] when the key is absent; no
    /// placeholder is ever substituted.
    fn resolve(&self, source_id: &str) -> Result<&str, TransformError>;
}

/// Bulk source of the name mapping table.
#[async_trait]
pub trait MappingSource: Send + Sync {
    /// Fetch the full `source → destination` table.
    async fn fetch_mappings(&self) -> CoreResult<HashMap<String, String>>;
}

/// Write-only tape status log.
#[async_trait]
pub trait TapeRegister: Send + Sync {
    /// Record `status` for `tape`.
    async fn set_status(&self, tape: &str, status: TapeStatus) -> CoreResult<()>;
}

/// Waits until a tape image and its ready marker are both present.
#[async_trait]
pub trait ImportConfirmer: Send + Sync {
    /// Ready marker path that accompanies `tape_location`.
    fn confirmation_marker(&self, tape_name: &str, tape_location: &Path) -> PathBuf;

    /// Block until both paths exist or the configured timeout elapses.
    async fn wait_for_confirmation(&self, tape_name: &str, tape_location: &Path) -> CoreResult<()>;
}

/// External slicing tool.
#[async_trait]
pub trait Slicer: Send + Sync {
    /// Extract payload files from `tape_location` into `output_directory`.
    async fn slice(
        &self,
        tape_location: &Path,
        output_directory: &Path,
        log_file: &Path,
    ) -> CoreResult<()>;
}

/// External sanity-check tool run over the slicer output.
#[async_trait]
pub trait SanityChecker: Send + Sync {
    /// Validate the slicer output of `tape_name`.
    async fn check(
        &self,
        tape_name: &str,
        slicer_log: &Path,
        slicer_output_directory: &Path,
        checker_log: &Path,
    ) -> CoreResult<()>;
}

/// Recursive upload of a local directory to object storage.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Upload every regular file below `directory`, returning the file count.
    async fn upload_dir(&self, directory: &Path) -> CoreResult<usize>;
}

/// One tape's link pass from the slicer output into the target tree.
///
/// The pass never fails as a whole; per-file failures live in the report.
pub trait Linker: Send + Sync {
    /// Create every link and report per-file outcomes.
    fn create_links(&self) -> LinkReport;
}
