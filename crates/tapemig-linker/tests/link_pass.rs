use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tapemig_core::{LinkError, LinkMode, Linker, TransformError};
use tapemig_linker::{LinkCreator, LinkPatterns, NameLookupTable, PathTransformer};
use tapemig_test_support::fixtures::{temp_dir, touch};
use tapemig_test_support::mocks::CountingMappingSource;

async fn transformer() -> Result<PathTransformer> {
    let source = CountingMappingSource::new(&[("AAG", "SFB"), ("ABB", "SFC")]);
    let table = NameLookupTable::load(&source).await?;
    Ok(PathTransformer::new(Arc::new(table)))
}

fn write(path: &Path, body: &str) -> Result<()> {
    touch(path)?;
    fs::write(path, body)?;
    Ok(())
}

#[tokio::test]
async fn every_matched_file_gets_exactly_one_outcome() -> Result<()> {
    let root = temp_dir()?;
    let source = root.path().join("slicer");
    let target = root.path().join("linker");
    write(&source.join("AAG.L100.FAAA"), "a")?;
    write(&source.join("AAG.L101.FBBB"), "b")?;
    write(&source.join("ABB.L200"), "c")?;
    write(&source.join("garbage"), "d")?;
    write(&source.join("UNK.L1.FAAA"), "e")?;

    let creator = LinkCreator::new(
        &source,
        &target,
        LinkPatterns::new(&["*".to_string()])?,
        transformer().await?,
        LinkMode::Hard,
    );
    let report = creator.create_links();

    assert_eq!(report.len(), 5);
    assert_eq!(report.linked_count(), 3);
    assert_eq!(report.failed_count(), 2);
    assert!(target.join("SFB/100FAA/100FAAA").is_file());
    assert!(target.join("SFB/101FBB/101FBBB").is_file());
    assert!(target.join("SFC/RES/200").is_file());

    let garbage = report
        .get(&source.join("garbage"))
        .and_then(|outcome| outcome.error())
        .map(LinkError::kind);
    assert_eq!(garbage, Some("unsupported_path"));
    let unmapped = report
        .get(&source.join("UNK.L1.FAAA"))
        .and_then(|outcome| outcome.error());
    assert!(matches!(
        unmapped,
        Some(LinkError::Transform {
            source: TransformError::MappingNotFound { .. }
        })
    ));
    Ok(())
}

#[tokio::test]
async fn pass_succeeds_when_every_file_fails() -> Result<()> {
    let root = temp_dir()?;
    let source = root.path().join("slicer");
    for name in ["a", "b.c.d.e", "NOPE.L1"] {
        write(&source.join(name), "x")?;
    }

    let creator = LinkCreator::new(
        &source,
        root.path().join("linker"),
        LinkPatterns::new(&["*".to_string()])?,
        transformer().await?,
        LinkMode::Hard,
    );
    let report = creator.create_links();
    assert_eq!(report.len(), 3);
    assert_eq!(report.failed_count(), 3);
    Ok(())
}

#[tokio::test]
async fn existing_target_is_never_overwritten() -> Result<()> {
    let root = temp_dir()?;
    let source = root.path().join("slicer");
    let target = root.path().join("linker");
    write(&source.join("AAG.L100.FAAA"), "new")?;
    write(&target.join("SFB/100FAA/100FAAA"), "old")?;

    let creator = LinkCreator::new(
        &source,
        &target,
        LinkPatterns::new(&["*".to_string()])?,
        transformer().await?,
        LinkMode::Hard,
    );
    let report = creator.create_links();

    let outcome = report
        .get(&source.join("AAG.L100.FAAA"))
        .and_then(|outcome| outcome.error())
        .map(LinkError::kind);
    assert_eq!(outcome, Some("already_exists"));
    assert_eq!(fs::read_to_string(target.join("SFB/100FAA/100FAAA"))?, "old");
    Ok(())
}

#[tokio::test]
async fn second_pass_reports_existing_targets() -> Result<()> {
    let root = temp_dir()?;
    let source = root.path().join("slicer");
    write(&source.join("AAG.L100"), "x")?;

    let creator = LinkCreator::new(
        &source,
        root.path().join("linker"),
        LinkPatterns::new(&["*".to_string()])?,
        transformer().await?,
        LinkMode::Hard,
    );
    assert_eq!(creator.create_links().linked_count(), 1);
    let second = creator.create_links();
    assert_eq!(second.linked_count(), 0);
    assert_eq!(second.failed_count(), 1);
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn hard_links_share_the_source_inode() -> Result<()> {
    use std::os::unix::fs::MetadataExt;

    let root = temp_dir()?;
    let source = root.path().join("slicer");
    let target = root.path().join("linker");
    write(&source.join("AAG.L100.FAAA"), "payload")?;

    let creator = LinkCreator::new(
        &source,
        &target,
        LinkPatterns::new(&["*".to_string()])?,
        transformer().await?,
        LinkMode::Hard,
    );
    creator.create_links();

    let original = fs::metadata(source.join("AAG.L100.FAAA"))?;
    let linked = fs::metadata(target.join("SFB/100FAA/100FAAA"))?;
    assert_eq!(original.ino(), linked.ino());
    assert_eq!(original.dev(), linked.dev());
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn symbolic_mode_points_at_the_source() -> Result<()> {
    let root = temp_dir()?;
    let source = root.path().join("slicer");
    let target = root.path().join("linker");
    write(&source.join("ABB.L200"), "payload")?;

    let creator = LinkCreator::new(
        &source,
        &target,
        LinkPatterns::new(&["*".to_string()])?,
        transformer().await?,
        LinkMode::Symbolic,
    );
    let report = creator.create_links();
    assert_eq!(report.linked_count(), 1);

    let link = target.join("SFC/RES/200");
    assert!(fs::symlink_metadata(&link)?.file_type().is_symlink());
    assert_eq!(fs::read_link(&link)?, source.join("ABB.L200"));
    Ok(())
}

#[tokio::test]
async fn parallel_workers_produce_the_same_report() -> Result<()> {
    let root = temp_dir()?;
    let source = root.path().join("slicer");
    for idx in 0..20 {
        write(&source.join(format!("AAG.L{idx}.FAAA")), "x")?;
    }
    write(&source.join("broken"), "x")?;

    let creator = LinkCreator::new(
        &source,
        root.path().join("linker"),
        LinkPatterns::new(&["*".to_string()])?,
        transformer().await?,
        LinkMode::Hard,
    )
    .with_workers(4);
    let report = creator.create_links();
    assert_eq!(report.len(), 21);
    assert_eq!(report.linked_count(), 20);
    assert_eq!(report.failed_count(), 1);
    Ok(())
}
