//! Parallel tape executor.
//!
//! # Design
//! - Tapes are the regular files of the input directory, minus ready markers.
//! - A fixed number of workers pull tape names from one shared queue; each
//!   worker runs a tape start to finish before taking the next one.
//! - Tape failures stay inside the unit of work. Only a worker that panics or
//!   is cancelled aborts the run.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tapemig_config::MigrationConfig;
use tapemig_core::RunSummary;
use tapemig_events::Event;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::error::{ExecutorError, ExecutorResult};
use crate::factory::UnitOfWorkFactory;

/// Runs every tape of the input directory on a bounded worker pool.
pub struct ParallelTapeExecutor {
    input_directory: PathBuf,
    ready_extension: String,
    workers: usize,
    factory: Arc<UnitOfWorkFactory>,
}

impl ParallelTapeExecutor {
    /// Executor over `input_directory` with `workers` concurrent tapes (minimum one).
    #[must_use]
    pub fn new(
        input_directory: impl Into<PathBuf>,
        ready_extension: impl Into<String>,
        workers: usize,
        factory: Arc<UnitOfWorkFactory>,
    ) -> Self {
        Self {
            input_directory: input_directory.into(),
            ready_extension: ready_extension.into(),
            workers: workers.max(1),
            factory,
        }
    }

    /// Build from the `executor` and `confirmer` configuration sections.
    #[must_use]
    pub fn from_config(config: &MigrationConfig, factory: Arc<UnitOfWorkFactory>) -> Self {
        Self::new(
            config.executor.input_directory.clone(),
            config.confirmer.ready_extension.clone(),
            config.executor.workers,
            factory,
        )
    }

    /// Tape names and locations found in the input directory, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the input directory cannot be listed.
    pub async fn discover(&self) -> ExecutorResult<Vec<(String, PathBuf)>> {
        let discovery_error = |source| ExecutorError::Discovery {
            path: self.input_directory.clone(),
            source,
        };
        let mut entries = tokio::fs::read_dir(&self.input_directory)
            .await
            .map_err(discovery_error)?;
        let mut tapes = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(discovery_error)? {
            let path = entry.path();
            let is_file = tokio::fs::metadata(&path)
                .await
                .is_ok_and(|meta| meta.is_file());
            if !is_file {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                debug!(path = %path.display(), "skipping non UTF-8 file name");
                continue;
            };
            if name.ends_with(&self.ready_extension) {
                continue;
            }
            tapes.push((name, path));
        }
        tapes.sort();
        Ok(tapes)
    }

    /// Process every discovered tape.
    ///
    /// # Errors
    ///
    /// Returns an error when discovery fails or a worker terminates
    /// abnormally; individual tape failures are not errors.
    pub async fn run(&self) -> ExecutorResult<RunSummary> {
        let tapes = self.discover().await?;
        let discovered = tapes.len();
        let workers = self.workers.min(discovered).max(1);
        info!(
            input_directory = %self.input_directory.display(),
            discovered,
            workers,
            "starting tape run"
        );

        let queue = Arc::new(Mutex::new(VecDeque::from(tapes)));
        let dispatched = Arc::new(AtomicUsize::new(0));
        let mut pool = JoinSet::new();
        for worker in 0..workers {
            let queue = Arc::clone(&queue);
            let dispatched = Arc::clone(&dispatched);
            let factory = Arc::clone(&self.factory);
            pool.spawn(async move {
                loop {
                    let next = queue.lock().await.pop_front();
                    let Some((tape, location)) = next else {
                        break;
                    };
                    dispatched.fetch_add(1, Ordering::SeqCst);
                    debug!(worker, tape = %tape, "worker picked up tape");
                    factory.create(&tape).process(&tape, &location).await;
                }
            });
        }

        while let Some(joined) = pool.join_next().await {
            if let Err(source) = joined {
                error!(error = %source, "executor worker terminated abnormally");
                pool.abort_all();
                return Err(ExecutorError::WorkerPanicked { source });
            }
        }

        let summary = RunSummary {
            discovered,
            dispatched: dispatched.load(Ordering::SeqCst),
        };
        self.factory
            .collaborators()
            .publish(Event::RunCompleted {
                discovered: summary.discovered,
                dispatched: summary.dispatched,
            });
        info!(
            discovered = summary.discovered,
            dispatched = summary.dispatched,
            "tape run finished"
        );
        Ok(summary)
    }
}
