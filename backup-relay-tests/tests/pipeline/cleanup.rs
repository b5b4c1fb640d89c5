//! Workspace lifecycle on every exit path

use backup_relay::{BackupManager, RunError, RunPhase};
use std::path::Path;
use test_utils::*;

/// Reports an artifact it never wrote
struct VanishingSource;

impl Source for VanishingSource {
    fn name(&self) -> &str {
        "vanishing"
    }

    fn kind(&self) -> &'static str {
        "fake"
    }

    fn backup(&self, workspace: &Path) -> Result<Artifact, SourceError> {
        std::fs::write(workspace.join("leftover.tmp"), "partial").unwrap();
        Ok(Artifact::complete("vanishing", workspace.join("never-written.sql")))
    }
}

#[test]
fn test_workspace_removed_after_success() {
    let ctx = TestContext::new();
    let root = ctx.workspace_root();
    let source = FakeSource::new("db");

    let report = BackupManager::new(
        "app",
        vec![source.clone().boxed()],
        vec![RecordingDestination::new("raw").boxed()],
    )
    .with_workspace_root(&root)
    .run()
    .unwrap();

    assert!(report.workspace.starts_with(&root));
    assert!(!report.workspace.exists());
    assert!(ctx.entries(&root).is_empty());
}

#[test]
fn test_workspace_removed_after_source_failure() {
    let ctx = TestContext::new();
    let root = ctx.workspace_root();
    let written = FakeSource::new("written");

    let err = BackupManager::new(
        "app",
        vec![written.clone().boxed(), FakeSource::new("bad").failing().boxed()],
        vec![],
    )
    .with_workspace_root(&root)
    .run()
    .unwrap_err();

    assert!(matches!(err, RunError::Source { .. }));
    assert!(!written.workspaces()[0].exists());
    assert!(ctx.entries(&root).is_empty());
}

#[test]
fn test_workspace_removed_after_aggregation_failure() {
    let ctx = TestContext::new();
    let root = ctx.workspace_root();
    let destination = RecordingDestination::new("raw");

    let err = BackupManager::new(
        "app",
        vec![FakeSource::new("db").boxed(), Box::new(VanishingSource)],
        vec![destination.clone().boxed()],
    )
    .with_workspace_root(&root)
    .run()
    .unwrap_err();

    assert_eq!(err.phase(), RunPhase::Aggregating);
    assert!(matches!(err, RunError::Aggregation(_)));
    assert!(destination.uploads().is_empty());
    assert!(ctx.entries(&root).is_empty());
}

#[test]
fn test_workspace_removed_after_upload_failure() {
    let ctx = TestContext::new();
    let root = ctx.workspace_root();
    let destination = RecordingDestination::new("raw").failing("network unreachable");

    let err = BackupManager::new(
        "app",
        vec![FakeSource::new("db").boxed()],
        vec![destination.clone().boxed()],
    )
    .with_workspace_root(&root)
    .run()
    .unwrap_err();

    assert!(matches!(err, RunError::Uploads(_)));
    // Artifacts existed while the destination was uploading
    assert_eq!(destination.only_upload().contents, vec![b"db".to_vec()]);
    assert!(!destination.only_upload().paths[0].exists());
    assert!(ctx.entries(&root).is_empty());
}

#[test]
fn test_workspace_named_after_app() {
    let ctx = TestContext::new();
    let source = FakeSource::new("db");

    BackupManager::new("billing", vec![source.clone().boxed()], vec![])
        .with_workspace_root(ctx.workspace_root())
        .run()
        .unwrap();

    let workspace = &source.workspaces()[0];
    let name = workspace.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("billing-backup-"));
}

#[test]
fn test_unusable_workspace_root() {
    let ctx = TestContext::new();
    let not_a_dir = ctx.create_file("occupied", "file, not a directory");
    let source = FakeSource::new("db");

    let err = BackupManager::new("app", vec![source.clone().boxed()], vec![])
        .with_workspace_root(&not_a_dir)
        .run()
        .unwrap_err();

    assert!(matches!(err, RunError::Workspace(_)));
    assert_eq!(err.phase(), RunPhase::Idle);
    assert_eq!(source.call_count(), 0);
}
