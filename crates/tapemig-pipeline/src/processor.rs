//! Unit of work: the ordered pipeline for one tape.
//!
//! Stages run strictly in order: confirm, slice, sanity check (when
//! configured), link, upload, cleanup. Each success writes the next forward
//! status; the first failure writes `FAILED` and stops the tape. Artifacts of
//! a failed tape are left in place.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tapemig_core::{
    CoreError, CoreResult, ImportConfirmer, LinkReport, Linker, PipelineStage, SanityChecker,
    Slicer, StageError, TapeRegister, TapeStatus, Uploader, error_chain,
};
use tapemig_events::{Event, EventBus};
use tapemig_telemetry::Metrics;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::cleanup::{delete_path, spawn_delete};
use crate::layout::TapeLayout;

/// Collaborators shared by every unit of work of a run.
#[derive(Clone)]
pub struct Collaborators {
    /// Status register.
    pub register: Arc<dyn TapeRegister>,
    /// Import confirmation.
    pub confirmer: Arc<dyn ImportConfirmer>,
    /// Slicing tool.
    pub slicer: Arc<dyn Slicer>,
    /// Optional sanity-check tool; `None` skips the stage.
    pub sanity_checker: Option<Arc<dyn SanityChecker>>,
    /// Object storage upload.
    pub uploader: Arc<dyn Uploader>,
    /// Event sink.
    pub events: EventBus,
    /// Metrics handle.
    pub metrics: Metrics,
}

impl Collaborators {
    pub(crate) fn publish(&self, event: Event) {
        self.metrics.inc_event(event.kind());
        self.events.publish(event);
    }
}

/// Wall-clock duration of each completed stage, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageDurations {
    entries: Vec<(PipelineStage, Duration)>,
}

impl StageDurations {
    fn record(&mut self, stage: PipelineStage, duration: Duration) {
        self.entries.push((stage, duration));
    }

    /// Duration of `stage`, when it ran.
    #[must_use]
    pub fn get(&self, stage: PipelineStage) -> Option<Duration> {
        self.entries
            .iter()
            .find(|(recorded, _)| *recorded == stage)
            .map(|(_, duration)| *duration)
    }

    /// Stages in execution order.
    pub fn stages(&self) -> impl Iterator<Item = PipelineStage> + '_ {
        self.entries.iter().map(|(stage, _)| *stage)
    }

    /// `stage=<ms>ms` pairs for the statistics log line.
    #[must_use]
    pub fn summary(&self) -> String {
        self.entries
            .iter()
            .map(|(stage, duration)| format!("{stage}={}ms", duration.as_millis()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Drives one tape through the pipeline.
pub struct UnitOfWorkProcessor {
    collaborators: Collaborators,
    linker: Arc<dyn Linker>,
    layout: TapeLayout,
}

impl UnitOfWorkProcessor {
    /// Build a processor for one tape's `layout`.
    #[must_use]
    pub fn new(collaborators: Collaborators, linker: Arc<dyn Linker>, layout: TapeLayout) -> Self {
        Self {
            collaborators,
            linker,
            layout,
        }
    }

    /// Working paths of this tape.
    #[must_use]
    pub const fn layout(&self) -> &TapeLayout {
        &self.layout
    }

    /// Run the pipeline for `tape_name`.
    ///
    /// Never fails: the outcome lands in the status register, the logs and
    /// the event bus. Returns the stage durations on success.
    pub async fn process(&self, tape_name: &str, tape_location: &Path) -> Option<StageDurations> {
        let started = Instant::now();
        let metrics = &self.collaborators.metrics;
        metrics.tape_entered();
        self.collaborators.publish(Event::TapeStarted {
            tape: tape_name.to_string(),
            location: tape_location.display().to_string(),
        });
        info!(
            tape = tape_name,
            location = %tape_location.display(),
            "unit of work starting"
        );

        let outcome = match self.run_stages(tape_name, tape_location).await {
            Ok(durations) => {
                let total = started.elapsed();
                metrics.inc_tape(TapeStatus::Finished.as_str());
                self.collaborators.publish(Event::TapeFinished {
                    tape: tape_name.to_string(),
                    duration_ms: millis(total),
                });
                info!(
                    tape = tape_name,
                    location = %tape_location.display(),
                    stages = %durations.summary(),
                    total_ms = millis(total),
                    "unit of work statistics"
                );
                Some(durations)
            }
            Err(err) => {
                self.fail(tape_name, &err).await;
                None
            }
        };
        metrics.tape_left();
        outcome
    }

    async fn run_stages(
        &self,
        tape: &str,
        location: &Path,
    ) -> Result<StageDurations, StageError> {
        let c = &self.collaborators;
        let layout = &self.layout;
        let mut durations = StageDurations::default();

        let ((), elapsed) = self
            .execute_stage(
                tape,
                PipelineStage::Confirm,
                c.confirmer.wait_for_confirmation(tape, location),
            )
            .await?;
        durations.record(PipelineStage::Confirm, elapsed);

        let ((), elapsed) = self
            .execute_stage(
                tape,
                PipelineStage::Slice,
                c.slicer
                    .slice(location, layout.slicer_output(), layout.slicer_log()),
            )
            .await?;
        durations.record(PipelineStage::Slice, elapsed);

        if let Some(checker) = &c.sanity_checker {
            let ((), elapsed) = self
                .execute_stage(
                    tape,
                    PipelineStage::SanityCheck,
                    checker.check(
                        tape,
                        layout.slicer_log(),
                        layout.slicer_output(),
                        layout.sanity_checker_log(),
                    ),
                )
                .await?;
            durations.record(PipelineStage::SanityCheck, elapsed);
        }

        let (report, elapsed) = self
            .execute_stage(tape, PipelineStage::Link, self.create_links())
            .await?;
        durations.record(PipelineStage::Link, elapsed);
        self.record_links(tape, &report);

        let (files, elapsed) = self
            .execute_stage(
                tape,
                PipelineStage::Upload,
                c.uploader.upload_dir(layout.linker_output()),
            )
            .await?;
        durations.record(PipelineStage::Upload, elapsed);
        info!(tape, files, "upload stage finished");

        let pending = vec![
            spawn_delete(layout.slicer_output().to_path_buf()),
            spawn_delete(layout.linker_output().to_path_buf()),
        ];
        let ((), elapsed) = self
            .execute_stage(
                tape,
                PipelineStage::Cleanup,
                self.final_cleanup(tape, location, pending),
            )
            .await?;
        durations.record(PipelineStage::Cleanup, elapsed);

        Ok(durations)
    }

    async fn execute_stage<T, F>(
        &self,
        tape: &str,
        stage: PipelineStage,
        op: F,
    ) -> Result<(T, Duration), StageError>
    where
        F: Future<Output = CoreResult<T>> + Send,
        T: Send,
    {
        let c = &self.collaborators;
        c.publish(Event::StageStarted {
            tape: tape.to_string(),
            stage: stage.as_str().to_string(),
        });
        info!(tape, stage = stage.as_str(), "stage starting");
        let started = Instant::now();

        let result = match op.await {
            Ok(value) => match stage.completion_status() {
                Some(status) => c.register.set_status(tape, status).await.map(|()| value),
                None => Ok(value),
            },
            Err(err) => Err(err),
        };
        let elapsed = started.elapsed();

        match result {
            Ok(value) => {
                c.metrics.inc_stage(stage.as_str(), "completed");
                c.metrics.observe_stage_duration(stage.as_str(), elapsed);
                c.publish(Event::StageCompleted {
                    tape: tape.to_string(),
                    stage: stage.as_str().to_string(),
                    duration_ms: millis(elapsed),
                });
                info!(
                    tape,
                    stage = stage.as_str(),
                    duration_ms = millis(elapsed),
                    "stage completed"
                );
                Ok((value, elapsed))
            }
            Err(err) => {
                c.metrics.inc_stage(stage.as_str(), "failed");
                Err(StageError::new(stage, err))
            }
        }
    }

    async fn create_links(&self) -> CoreResult<LinkReport> {
        let linker = Arc::clone(&self.linker);
        tokio::task::spawn_blocking(move || linker.create_links())
            .await
            .map_err(|source| CoreError::Task {
                operation: "link.create_links",
                source: Box::new(source),
            })
    }

    fn record_links(&self, tape: &str, report: &LinkReport) {
        let linked = report.linked_count();
        let failed = report.failed_count();
        self.collaborators.metrics.add_links(
            u64::try_from(linked).unwrap_or(u64::MAX),
            u64::try_from(failed).unwrap_or(u64::MAX),
        );
        self.collaborators.publish(Event::LinksCreated {
            tape: tape.to_string(),
            linked,
            failed,
        });
        if failed > 0 {
            warn!(tape, linked, failed, "some files could not be linked");
        }
    }

    async fn final_cleanup(
        &self,
        tape: &str,
        location: &Path,
        pending: Vec<JoinHandle<CoreResult<()>>>,
    ) -> CoreResult<()> {
        for handle in pending {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    warn!(tape, error = %error_chain(&err), "background delete failed");
                }
                Err(err) => warn!(tape, error = %err, "background delete did not finish"),
            }
        }

        let marker = self
            .collaborators
            .confirmer
            .confirmation_marker(tape, location);
        for path in [
            self.layout.slicer_output(),
            self.layout.linker_output(),
            location,
            marker.as_path(),
        ] {
            delete_path(path, true).await?;
        }
        info!(tape, "working directories and tape files removed");
        Ok(())
    }

    async fn fail(&self, tape: &str, err: &StageError) {
        let c = &self.collaborators;
        let stage = err.stage.as_str();
        let message = error_chain(err);
        error!(
            tape,
            stage,
            error = %message,
            detail = ?err.source,
            "unit of work failed"
        );

        if let Err(write_err) = c.register.set_status(tape, TapeStatus::Failed).await {
            warn!(
                tape,
                error = %error_chain(&write_err),
                "failed to record FAILED status"
            );
        }
        c.metrics.inc_tape(TapeStatus::Failed.as_str());
        c.publish(Event::StageFailed {
            tape: tape.to_string(),
            stage: stage.to_string(),
            message,
        });
        c.publish(Event::TapeFailed {
            tape: tape.to_string(),
            stage: stage.to_string(),
        });
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
