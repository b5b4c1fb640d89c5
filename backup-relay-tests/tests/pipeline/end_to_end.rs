//! Configuration-driven runs with every collaborator mocked or stubbed

use backup_relay::config::{build_destinations_with, build_sources, Config};
use backup_relay::utils::http::ReqwestClient;
use backup_relay::BackupManager;
use std::sync::Arc;
use test_utils::*;

/// Build a manager from `config`, routing every destination to `store`
fn manager(
    config: &Config,
    resolver: &StaticResolver,
    executor: Arc<dyn CommandExecutor>,
    http: Arc<dyn HttpClient>,
    store: &MockObjectStore,
) -> BackupManager {
    let sources = build_sources(config, resolver, executor, http)
        .unwrap()
        .into_iter()
        .map(|s| Box::new(s) as Box<dyn Source>)
        .collect();
    let destinations = build_destinations_with(config, resolver, |_| {
        Ok(Arc::new(store.clone()) as Arc<dyn ObjectStore>)
    })
    .unwrap()
    .into_iter()
    .map(|d| Box::new(d) as Box<dyn Destination>)
    .collect();

    let mut manager = BackupManager::new(&config.app, sources, destinations)
        .with_archive_kind(config.archive_type);
    if let Some(root) = &config.workspace_root {
        manager = manager.with_workspace_root(root);
    }
    manager
}

#[test]
fn test_raw_files_to_ungrouped_bucket() {
    let builder = ConfigBuilder::new("my-app");
    let first = builder.create_file("data/first.txt", "first");
    let second = builder.create_file("other/second.txt", "second");
    let (config, _dir) = builder
        .add_files_source("config", &[first, second])
        .add_s3_destination("remote", "backups", false)
        .build_with_dir();
    let store = MockObjectStore::new();

    let report = manager(
        &config,
        &StaticResolver::new(),
        Arc::new(MockExecutor::new()),
        Arc::new(MockHttpClient::new()),
        &store,
    )
    .run()
    .unwrap();

    // The bucket received the per-source archive, not the combined one
    let keys = store.put_keys();
    assert_eq!(keys.len(), 1);
    assert!(keys[0].starts_with("config_"));
    assert!(keys[0].ends_with(".tar"));
    assert_ne!(keys[0], report.combined_archive);
    assert_eq!(store.created_buckets(), vec!["backups"]);

    let object = store.object(&keys[0]).unwrap();
    let contents = archive_contents_from_bytes(&object, ArchiveKind::Tar);
    assert_eq!(contents.get("first.txt").unwrap(), b"first");
    assert_eq!(contents.get("second.txt").unwrap(), b"second");
    assert_eq!(contents.len(), 2);
}

#[test]
fn test_http_500_snapshot_still_succeeds() {
    let stub = HttpStub::serve_once(500, "application/json", r#"{"status":"KO"}"#);
    let (config, _dir) = ConfigBuilder::new("my-app")
        .add_http_source("health", &format!("{}/health", stub.url()))
        .add_s3_destination("remote", "backups", false)
        .build_with_dir();
    let store = MockObjectStore::new().with_bucket("backups");

    let report = manager(
        &config,
        &StaticResolver::new(),
        Arc::new(MockExecutor::new()),
        Arc::new(ReqwestClient::new().unwrap()),
        &store,
    )
    .run()
    .unwrap();

    assert_eq!(report.degraded().count(), 1);
    let key = &store.put_keys()[0];
    let snapshot: serde_json::Value =
        serde_json::from_slice(&store.object(key).unwrap()).unwrap();
    assert_eq!(snapshot["result"], 500);
    assert_eq!(snapshot["detail"], serde_json::json!({"status": "KO"}));
    assert!(snapshot["timestamp"].as_str().unwrap().contains('T'));
}

#[test]
fn test_mixed_pipeline() {
    let builder = ConfigBuilder::new("shop").with_archive_type(ArchiveKind::Zip);
    let settings = builder.create_file("settings.yml", "debug: false");
    let (config, _dir) = builder
        .add_postgres_source("main db", "shop")
        .add_files_source("settings", &[settings])
        .add_http_source("status", "http://shop.internal/status")
        .add_s3_destination("archive", "cold", true)
        .add_s3_destination("raw", "hot", false)
        .build_with_dir();
    let resolver = StaticResolver::new()
        .with("PG_MAIN_DB_USERNAME", "shop")
        .with("PG_MAIN_DB_PASSWORD", "hunter2");
    let executor = MockExecutor::new().expect(
        "pg_dump",
        MockResponse::Success {
            stdout: "-- PostgreSQL database dump".to_string(),
        },
    );
    let http = MockHttpClient::new()
        .with_default_response(MockHttpResponse::json(200, r#"{"ok":true}"#));
    let store = MockObjectStore::new();

    let report = manager(
        &config,
        &resolver,
        Arc::new(executor.clone()),
        Arc::new(http.clone()),
        &store,
    )
    .run()
    .unwrap();

    assert!(report.is_fully_captured());
    assert!(report.combined_archive.starts_with("shop_backup_"));
    assert!(report.combined_archive.ends_with(".zip"));

    // pg_dump ran once against the configured database
    let call = &executor.get_calls()[0];
    assert_eq!(call.args.last().unwrap(), "shop");
    assert!(call.args.contains(&"--username=shop".to_string()));
    assert_eq!(http.get_requests().len(), 1);

    // cold gets the combined archive; hot gets the three artifacts
    let keys = store.put_keys();
    assert_eq!(keys.len(), 4);
    assert_eq!(keys[0], report.combined_archive);
    let object = store.object(&keys[0]).unwrap();
    let combined = archive_contents_from_bytes(&object, ArchiveKind::Zip);
    let combined_names: Vec<_> = combined.keys().cloned().collect();
    let mut artifact_names: Vec<_> = report
        .artifacts
        .iter()
        .map(|a| a.file_name.clone())
        .collect();
    assert_eq!(keys[1..].to_vec(), artifact_names);
    artifact_names.sort();
    assert_eq!(combined_names, artifact_names);

    assert_eq!(store.created_buckets(), vec!["cold", "hot"]);
}
