//! Filesystem import confirmation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tapemig_config::ConfirmerConfig;
use tapemig_core::{CoreError, CoreResult, ImportConfirmer};
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Polls for a tape image and its `<name><ext>` ready marker.
#[derive(Debug, Clone)]
pub struct TapeImportConfirmer {
    ready_extension: String,
    timeout: Duration,
    poll_interval: Duration,
}

impl TapeImportConfirmer {
    /// Build a confirmer; the poll interval is clamped to at least one millisecond.
    #[must_use]
    pub fn new(ready_extension: impl Into<String>, timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            ready_extension: ready_extension.into(),
            timeout,
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
        }
    }

    /// Build from the `confirmer` configuration section.
    #[must_use]
    pub fn from_config(config: &ConfirmerConfig) -> Self {
        Self::new(
            config.ready_extension.clone(),
            config.timeout(),
            config.poll_interval(),
        )
    }

    /// Extension that marks a tape image as completely exported.
    #[must_use]
    pub fn ready_extension(&self) -> &str {
        &self.ready_extension
    }
}

#[async_trait]
impl ImportConfirmer for TapeImportConfirmer {
    fn confirmation_marker(&self, tape_name: &str, tape_location: &Path) -> PathBuf {
        let parent = tape_location.parent().unwrap_or_else(|| Path::new(""));
        parent.join(format!("{tape_name}{}", self.ready_extension))
    }

    async fn wait_for_confirmation(&self, tape_name: &str, tape_location: &Path) -> CoreResult<()> {
        let marker = self.confirmation_marker(tape_name, tape_location);
        let started = Instant::now();
        loop {
            if exists(tape_location).await && exists(&marker).await {
                info!(
                    tape = tape_name,
                    waited_ms = started.elapsed().as_millis(),
                    "tape import confirmed"
                );
                return Ok(());
            }
            let waited = started.elapsed();
            if waited >= self.timeout {
                return Err(CoreError::ConfirmationTimeout {
                    tape_location: tape_location.to_path_buf(),
                    marker,
                    waited,
                });
            }
            debug!(
                tape = tape_name,
                marker = %marker.display(),
                "waiting for tape import confirmation"
            );
            sleep(self.poll_interval.min(self.timeout - waited)).await;
        }
    }
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}
