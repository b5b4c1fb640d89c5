//! PostgreSQL dumps through the real executor
//!
//! The container publishes its port on the host so the host's `pg_dump`
//! connects the same way a production run would.

use super::common::{is_docker_available, is_tool_available, ContainerGuard};
use anyhow::{anyhow, Result};
use backup_relay::config::DatabaseSourceConfig;
use backup_relay::sources::{DatabaseEngine, DatabaseSource};
use backup_relay::utils::executor::RealExecutor;
use backup_relay::BackupManager;
use std::process::Command;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use test_utils::*;

const PASSWORD: &str = "test:pa\\ss";

fn should_skip() -> bool {
    if !is_docker_available() {
        println!("Docker not available, skipping test");
        return true;
    }
    if !is_tool_available("pg_dump") {
        println!("pg_dump not installed, skipping test");
        return true;
    }
    false
}

/// Start PostgreSQL published on `port` and wait until it accepts connections
fn start_postgres_container(name: &str, port: u16) -> Result<()> {
    let output = Command::new("docker")
        .args([
            "run",
            "-d",
            "--name",
            name,
            "-p",
            &format!("{}:5432", port),
            "-e",
            &format!("POSTGRES_PASSWORD={}", PASSWORD),
            "-e",
            "POSTGRES_DB=testdb",
            "postgres:15-alpine",
        ])
        .output()?;
    if !output.status.success() {
        return Err(anyhow!(
            "docker run failed: {}",
            String::from_utf8_lossy(&output.stderr)
        ));
    }

    for _ in 0..30 {
        // The init script restarts the server once, so require a real query
        let ready = exec_sql(name, "SELECT 1").map(|out| out == "1").unwrap_or(false);
        if ready {
            return Ok(());
        }
        thread::sleep(Duration::from_secs(1));
    }

    Err(anyhow!("PostgreSQL failed to become ready"))
}

fn exec_sql(container: &str, sql: &str) -> Result<String> {
    let output = Command::new("docker")
        .args([
            "exec", container, "psql", "-h", "127.0.0.1", "-U", "postgres", "-d", "testdb", "-t",
            "-c", sql,
        ])
        .output()?;
    if !output.status.success() {
        return Err(anyhow!("{}", String::from_utf8_lossy(&output.stderr)));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn create_test_data(container: &str) -> Result<()> {
    exec_sql(container, "CREATE TABLE orders (id SERIAL PRIMARY KEY, item TEXT)")?;
    exec_sql(container, "INSERT INTO orders (item) VALUES ('widget'), ('gadget')")?;
    Ok(())
}

fn source_config(port: u16, database: Option<&str>) -> DatabaseSourceConfig {
    DatabaseSourceConfig {
        name: "main db".to_string(),
        backup_filename: "main_db".to_string(),
        host: "127.0.0.1".to_string(),
        port: Some(port),
        database: database.map(str::to_string),
        all_databases: database.is_none(),
        ..Default::default()
    }
}

fn resolver() -> StaticResolver {
    StaticResolver::new()
        .with("PG_MAIN_DB_USERNAME", "postgres")
        .with("PG_MAIN_DB_PASSWORD", PASSWORD)
}

#[test]
#[ignore] // Requires Docker and pg_dump
fn test_postgres_dump_single_database() {
    if should_skip() {
        return;
    }

    let container = ContainerGuard::new("backup-relay-test-postgres-single");
    start_postgres_container(container.name(), 55432).expect("Failed to start PostgreSQL");
    create_test_data(container.name()).expect("Failed to create test data");

    let ctx = TestContext::new();
    let source = DatabaseSource::from_config(
        DatabaseEngine::Postgres,
        &source_config(55432, Some("testdb")),
        &resolver(),
        Arc::new(RealExecutor::new()),
    )
    .expect("Failed to build source");

    let artifact = source.backup(ctx.temp_dir()).expect("Backup failed");

    assert!(artifact.status.is_complete(), "{}", artifact.status);
    let dump = std::fs::read_to_string(&artifact.path).unwrap();
    assert!(dump.contains("CREATE TABLE public.orders"));
    assert!(dump.contains("widget"));
    // Only the artifact is left behind
    assert_eq!(ctx.entries(ctx.temp_dir()), vec![artifact.file_name()]);
}

#[test]
#[ignore] // Requires Docker and pg_dump
fn test_postgres_wrong_password_is_degraded() {
    if should_skip() {
        return;
    }

    let container = ContainerGuard::new("backup-relay-test-postgres-denied");
    start_postgres_container(container.name(), 55433).expect("Failed to start PostgreSQL");

    let ctx = TestContext::new();
    let mut config = source_config(55433, Some("testdb"));
    config.password = Some("wrong".to_string());
    let source = DatabaseSource::from_config(
        DatabaseEngine::Postgres,
        &config,
        &resolver(),
        Arc::new(RealExecutor::new()),
    )
    .unwrap();

    let artifact = source.backup(ctx.temp_dir()).unwrap();

    assert!(!artifact.status.is_complete());
    assert!(artifact.path.exists());
}

#[test]
#[ignore] // Requires Docker and pg_dumpall
fn test_postgres_pipeline_with_all_databases() {
    if should_skip() || !is_tool_available("pg_dumpall") {
        return;
    }

    let container = ContainerGuard::new("backup-relay-test-postgres-all");
    start_postgres_container(container.name(), 55434).expect("Failed to start PostgreSQL");
    create_test_data(container.name()).expect("Failed to create test data");

    let ctx = TestContext::new();
    let source = DatabaseSource::from_config(
        DatabaseEngine::Postgres,
        &source_config(55434, None),
        &resolver(),
        Arc::new(RealExecutor::new()),
    )
    .unwrap();
    let destination = RecordingDestination::new("archive").grouped();

    let sources: Vec<Box<dyn Source>> = vec![Box::new(source)];
    let report = BackupManager::new("shop", sources, vec![destination.clone().boxed()])
        .with_workspace_root(ctx.workspace_root())
        .run()
        .expect("Run failed");

    assert!(report.is_fully_captured());
    let upload = destination.only_upload();
    let members = archive_contents_from_bytes(&upload.contents[0], ArchiveKind::Tar);
    let dump = String::from_utf8_lossy(members.values().next().unwrap()).into_owned();
    assert!(dump.contains("CREATE DATABASE testdb"));
    assert!(dump.contains("gadget"));
}
