mod common;

use std::sync::Arc;

use anyhow::Result;
use common::{HarnessBuilder, exists};
use tapemig_core::TapeStatus;
use tapemig_events::Event;
use tapemig_test_support::fixtures::touch;
use tapemig_test_support::mocks::{
    CountingLinker, RecordingRegister, ScriptedConfirmer, ScriptedSanityChecker, ScriptedSlicer,
    ScriptedUploader,
};

#[tokio::test]
async fn successful_tape_walks_every_status_and_cleans_up() -> Result<()> {
    let harness = HarnessBuilder::new().build()?;
    let location = harness.stage_tape("T00001")?;
    let processor = harness.factory()?.create("T00001");

    let durations = processor
        .process("T00001", &location)
        .await
        .ok_or_else(|| anyhow::anyhow!("tape should finish"))?;

    assert_eq!(
        harness.register.statuses_for("T00001"),
        vec![
            TapeStatus::Exported,
            TapeStatus::Sliced,
            TapeStatus::Sanitized,
            TapeStatus::Linked,
            TapeStatus::Finished,
        ]
    );
    assert_eq!(durations.stages().count(), 6);
    assert_eq!(
        harness.uploader.calls(),
        vec![processor.layout().linker_output().to_path_buf()]
    );
    assert!(!exists(&location));
    assert!(!exists(&harness.input_dir().join("T00001.ready")));
    assert!(!exists(processor.layout().slicer_output()));
    assert!(!exists(processor.layout().linker_output()));
    assert!(exists(processor.layout().slicer_log()));

    let events = harness.events_for("T00001");
    assert!(events.contains(&Event::LinksCreated {
        tape: "T00001".into(),
        linked: 2,
        failed: 1,
    }));
    assert!(matches!(events.last(), Some(Event::TapeFinished { .. })));

    let snapshot = harness.metrics.snapshot();
    assert_eq!(snapshot.tapes_finished, 1);
    assert_eq!(snapshot.links_created, 2);
    assert_eq!(snapshot.links_failed, 1);
    assert_eq!(snapshot.active_tapes, 0);
    Ok(())
}

#[tokio::test]
async fn slicer_failure_stops_before_later_stages() -> Result<()> {
    let harness = HarnessBuilder::new()
        .slicer(ScriptedSlicer::new().failing_for("T00002"))
        .build()?;
    let location = harness.stage_tape("T00002")?;
    let linker = Arc::new(CountingLinker::new());
    let processor = harness.processor_with_linker("T00002", linker.clone());

    assert!(processor.process("T00002", &location).await.is_none());
    assert_eq!(linker.calls(), 0);

    assert_eq!(
        harness.register.statuses_for("T00002"),
        vec![TapeStatus::Exported, TapeStatus::Failed]
    );
    let checker = harness
        .checker
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("checker configured"))?;
    assert!(checker.calls().is_empty());
    assert!(harness.uploader.calls().is_empty());
    assert!(exists(&location), "artifacts stay for inspection");

    let events = harness.events_for("T00002");
    assert!(events.iter().any(|event| matches!(
        event,
        Event::StageFailed { stage, message, .. }
            if stage == "slice" && message.contains("external tool failed")
    )));
    assert!(!events
        .iter()
        .any(|event| matches!(event, Event::LinksCreated { .. })));
    assert_eq!(
        events.last(),
        Some(&Event::TapeFailed {
            tape: "T00002".into(),
            stage: "slice".into(),
        })
    );
    assert_eq!(harness.metrics.snapshot().tapes_failed, 1);
    Ok(())
}

#[tokio::test]
async fn confirmation_timeout_fails_before_slicing() -> Result<()> {
    let harness = HarnessBuilder::new()
        .confirmer(ScriptedConfirmer::new(".ready").timing_out_for("T00003"))
        .build()?;
    let location = harness.stage_tape("T00003")?;

    harness
        .factory()?
        .create("T00003")
        .process("T00003", &location)
        .await;

    assert_eq!(
        harness.register.statuses_for("T00003"),
        vec![TapeStatus::Failed]
    );
    assert!(harness.slicer.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn sanity_stage_is_skipped_when_not_configured() -> Result<()> {
    let harness = HarnessBuilder::new().checker(None).build()?;
    let location = harness.stage_tape("T00004")?;

    harness
        .factory()?
        .create("T00004")
        .process("T00004", &location)
        .await;

    assert_eq!(
        harness.register.statuses_for("T00004"),
        vec![
            TapeStatus::Exported,
            TapeStatus::Sliced,
            TapeStatus::Linked,
            TapeStatus::Finished,
        ]
    );
    Ok(())
}

#[tokio::test]
async fn sanity_failure_keeps_slicer_output() -> Result<()> {
    let harness = HarnessBuilder::new()
        .checker(Some(ScriptedSanityChecker::new().failing_for("T00005")))
        .build()?;
    let location = harness.stage_tape("T00005")?;
    let processor = harness.factory()?.create("T00005");

    processor.process("T00005", &location).await;

    assert_eq!(
        harness.register.last_status("T00005"),
        Some(TapeStatus::Failed)
    );
    assert!(exists(&processor.layout().slicer_output().join("AAG.L123")));
    assert!(!exists(processor.layout().linker_output()));
    Ok(())
}

#[tokio::test]
async fn upload_failure_leaves_link_tree_and_tape() -> Result<()> {
    let harness = HarnessBuilder::new()
        .uploader(ScriptedUploader::new().failing_for("T00006"))
        .build()?;
    let location = harness.stage_tape("T00006")?;
    let processor = harness.factory()?.create("T00006");

    processor.process("T00006", &location).await;

    assert_eq!(
        harness.register.statuses_for("T00006"),
        vec![
            TapeStatus::Exported,
            TapeStatus::Sliced,
            TapeStatus::Sanitized,
            TapeStatus::Linked,
            TapeStatus::Failed,
        ]
    );
    assert!(exists(
        &processor.layout().linker_output().join("SFB/123FAA/123FAAA")
    ));
    assert!(exists(&processor.layout().linker_output().join("SFB/RES/123")));
    assert!(exists(&location));
    Ok(())
}

#[tokio::test]
async fn status_write_failure_is_a_stage_failure() -> Result<()> {
    let harness = HarnessBuilder::new()
        .register(RecordingRegister::failing_on(TapeStatus::Linked))
        .build()?;
    let location = harness.stage_tape("T00007")?;

    let outcome = harness
        .factory()?
        .create("T00007")
        .process("T00007", &location)
        .await;

    assert!(outcome.is_none());
    assert_eq!(
        harness.register.last_status("T00007"),
        Some(TapeStatus::Failed)
    );
    assert!(harness.uploader.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn failed_status_write_is_swallowed() -> Result<()> {
    let harness = HarnessBuilder::new()
        .register(RecordingRegister::failing_on(TapeStatus::Failed))
        .slicer(ScriptedSlicer::new().failing_for("T00008"))
        .build()?;
    let location = harness.stage_tape("T00008")?;

    let outcome = harness
        .factory()?
        .create("T00008")
        .process("T00008", &location)
        .await;

    assert!(outcome.is_none());
    assert_eq!(
        harness.register.statuses_for("T00008"),
        vec![TapeStatus::Exported, TapeStatus::Failed]
    );
    assert!(matches!(
        harness.events_for("T00008").last(),
        Some(Event::TapeFailed { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn link_task_failure_skips_upload() -> Result<()> {
    let harness = HarnessBuilder::new().build()?;
    let location = harness.stage_tape("T00009")?;
    let linker = Arc::new(CountingLinker::panicking());
    let processor = harness.processor_with_linker("T00009", linker.clone());

    assert!(processor.process("T00009", &location).await.is_none());

    assert_eq!(linker.calls(), 1);
    assert_eq!(
        harness.register.statuses_for("T00009"),
        vec![
            TapeStatus::Exported,
            TapeStatus::Sliced,
            TapeStatus::Sanitized,
            TapeStatus::Failed,
        ]
    );
    assert!(harness.uploader.calls().is_empty());
    assert_eq!(
        harness.events_for("T00009").last(),
        Some(&Event::TapeFailed {
            tape: "T00009".into(),
            stage: "link".into(),
        })
    );
    Ok(())
}

#[tokio::test]
async fn cleanup_failure_overrides_finished() -> Result<()> {
    let harness = HarnessBuilder::new().build()?;
    // A regular file as parent directory makes the tape path unremovable,
    // whatever the privileges of the test process.
    let blocker = harness.input_dir().join("blocker");
    touch(&blocker)?;
    let location = blocker.join("T00010");
    let processor = harness.factory()?.create("T00010");

    assert!(processor.process("T00010", &location).await.is_none());

    assert_eq!(
        harness.register.statuses_for("T00010"),
        vec![
            TapeStatus::Exported,
            TapeStatus::Sliced,
            TapeStatus::Sanitized,
            TapeStatus::Linked,
            TapeStatus::Finished,
            TapeStatus::Failed,
        ]
    );
    assert_eq!(harness.uploader.calls().len(), 1);
    let events = harness.events_for("T00010");
    assert!(events.iter().any(|event| matches!(
        event,
        Event::StageFailed { stage, .. } if stage == "cleanup"
    )));
    assert_eq!(
        events.last(),
        Some(&Event::TapeFailed {
            tape: "T00010".into(),
            stage: "cleanup".into(),
        })
    );
    assert_eq!(harness.metrics.snapshot().tapes_failed, 1);
    Ok(())
}
