//! Credential fallback through the resolver and the process environment

use backup_relay::config::ConfigError;
use backup_relay::sources::{DatabaseEngine, DatabaseSource};
use backup_relay::utils::credentials::{resolve_credential, EnvResolver};
use rstest::rstest;
use serial_test::serial;
use std::sync::Arc;
use test_utils::*;

fn unnamed_credentials(name: &str) -> DatabaseSourceConfig {
    DatabaseSourceConfig {
        name: name.to_string(),
        backup_filename: "dump".to_string(),
        host: "localhost".to_string(),
        database: Some("app".to_string()),
        ..Default::default()
    }
}

#[rstest]
#[case(DatabaseEngine::Mysql, "MYSQL_MY_DB_USERNAME", "MYSQL_MY_DB_PASSWORD")]
#[case(DatabaseEngine::Postgres, "PG_MY_DB_USERNAME", "PG_MY_DB_PASSWORD")]
fn test_database_credentials_read_normalized_variables(
    #[case] engine: DatabaseEngine,
    #[case] username_var: &str,
    #[case] password_var: &str,
) {
    let resolver = StaticResolver::new()
        .with(username_var, "user")
        .with(password_var, "pass");

    DatabaseSource::from_config(
        engine,
        &unnamed_credentials("My DB"),
        &resolver,
        Arc::new(MockExecutor::new()),
    )
    .unwrap();

    assert_eq!(resolver.lookups(), vec![username_var, password_var]);
}

#[test]
fn test_missing_password_names_variable() {
    let resolver = StaticResolver::new().with("PG_MY_DB_USERNAME", "user");

    let err = DatabaseSource::from_config(
        DatabaseEngine::Postgres,
        &unnamed_credentials("My DB"),
        &resolver,
        Arc::new(MockExecutor::new()),
    )
    .unwrap_err();

    assert!(matches!(
        err,
        ConfigError::MissingCredential { ref variable, .. } if variable == "PG_MY_DB_PASSWORD"
    ));
}

#[test]
fn test_selector_checked_before_credentials() {
    let resolver = StaticResolver::new();
    let mut config = unnamed_credentials("My DB");
    config.database = None;

    let err = DatabaseSource::from_config(
        DatabaseEngine::Mysql,
        &config,
        &resolver,
        Arc::new(MockExecutor::new()),
    )
    .unwrap_err();

    assert!(matches!(err, ConfigError::MissingDatabaseSelector(_)));
    assert!(resolver.lookups().is_empty());
}

#[test]
#[serial]
fn test_env_resolver_reads_process_environment() {
    std::env::set_var("MYSQL_RELAY_TEST_DB_USERNAME", "env-user");

    let value = resolve_credential(
        None,
        &EnvResolver::new(),
        "MYSQL",
        "relay test db",
        "USERNAME",
    )
    .unwrap();

    std::env::remove_var("MYSQL_RELAY_TEST_DB_USERNAME");
    assert_eq!(value, "env-user");
}

#[test]
#[serial]
fn test_env_resolver_ignores_empty_values() {
    std::env::set_var("S3_RELAY_EMPTY_ACCESS_KEY_ID", "");

    let result = resolve_credential(
        None,
        &EnvResolver::new(),
        "S3",
        "relay empty",
        "ACCESS_KEY_ID",
    );

    std::env::remove_var("S3_RELAY_EMPTY_ACCESS_KEY_ID");
    result.assert_err_contains("S3_RELAY_EMPTY_ACCESS_KEY_ID");
}
