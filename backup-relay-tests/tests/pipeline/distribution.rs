//! Routing of artifacts to grouped and ungrouped destinations

use backup_relay::{BackupManager, RunError, RunPhase};
use rstest::rstest;
use test_utils::*;

fn sources(count: usize) -> Vec<Box<dyn Source>> {
    (0..count)
        .map(|i| FakeSource::new(&format!("source{}", i)).boxed())
        .collect()
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(5)]
fn test_list_lengths(#[case] source_count: usize) {
    let ctx = TestContext::new();
    let grouped = RecordingDestination::new("grouped").grouped();
    let ungrouped = RecordingDestination::new("ungrouped");

    let report = BackupManager::new(
        "app",
        sources(source_count),
        vec![grouped.clone().boxed(), ungrouped.clone().boxed()],
    )
    .with_workspace_root(ctx.workspace_root())
    .run()
    .unwrap();

    let grouped_upload = grouped.only_upload();
    assert_eq!(grouped_upload.files, vec![report.combined_archive.clone()]);
    assert_eq!(ungrouped.only_upload().files.len(), source_count);

    assert_eq!(report.uploads.len(), 2);
    assert!(report.uploads[0].grouped);
    assert_eq!(report.uploads[1].files.len(), source_count);
}

#[test]
fn test_ungrouped_destination_gets_original_artifacts() {
    let ctx = TestContext::new();
    let destination = RecordingDestination::new("raw");

    BackupManager::new(
        "app",
        vec![
            FakeSource::new("db").with_content("-- dump").boxed(),
            FakeSource::new("api").with_content("{}").boxed(),
        ],
        vec![destination.clone().boxed()],
    )
    .with_workspace_root(ctx.workspace_root())
    .run()
    .unwrap();

    let upload = destination.only_upload();
    assert_eq!(upload.contents, vec![b"-- dump".to_vec(), b"{}".to_vec()]);
}

#[test]
fn test_every_destination_attempted_after_failure() {
    let ctx = TestContext::new();
    let first = RecordingDestination::new("first").failing("access denied");
    let second = RecordingDestination::new("second").grouped();
    let third = RecordingDestination::new("third").failing("bucket gone");

    let err = BackupManager::new(
        "app",
        sources(2),
        vec![first.clone().boxed(), second.clone().boxed(), third.clone().boxed()],
    )
    .with_workspace_root(ctx.workspace_root())
    .run()
    .unwrap_err();

    assert_eq!(first.uploads().len(), 1);
    assert_eq!(second.uploads().len(), 1);
    assert_eq!(third.uploads().len(), 1);

    assert_eq!(err.phase(), RunPhase::DistributingUploads);
    match err {
        RunError::Uploads(failures) => {
            let names: Vec<_> = failures.iter().map(|f| f.destination.as_str()).collect();
            assert_eq!(names, vec!["first", "third"]);
            assert!(failures[0].error.contains("access denied"));
            assert!(failures[1].error.contains("bucket gone"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_destinations_run_in_configuration_order() {
    let ctx = TestContext::new();
    let store = MockObjectStore::new().with_bucket("a").with_bucket("b");
    let config = ConfigBuilder::new("app")
        .add_s3_destination("first", "a", true)
        .add_s3_destination("second", "b", false)
        .build();
    let destinations = backup_relay::config::build_destinations_with(
        &config,
        &StaticResolver::new(),
        |_| Ok(std::sync::Arc::new(store.clone()) as std::sync::Arc<dyn ObjectStore>),
    )
    .unwrap()
    .into_iter()
    .map(|d| Box::new(d) as Box<dyn Destination>)
    .collect();

    let report = BackupManager::new("app", sources(2), destinations)
        .with_workspace_root(ctx.workspace_root())
        .run()
        .unwrap();

    let buckets: Vec<_> = store
        .get_calls()
        .into_iter()
        .filter_map(|call| match call {
            StorageCall::PutObject { bucket, .. } => Some(bucket),
            _ => None,
        })
        .collect();
    assert_eq!(buckets, vec!["a", "b", "b"]);
    assert_eq!(store.put_keys()[0], report.combined_archive);
}
