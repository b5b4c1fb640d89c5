//! Fluent API for building test configurations
//!
//! Provides a builder pattern for creating test configurations with sensible defaults.

use backup_relay::config::{
    Config, DatabaseSourceConfig, DestinationConfig, HttpSourceConfig, LoggingSettings,
    RawFilesConfig, S3DestinationConfig, SourceConfig,
};
use backup_relay::utils::archive::ArchiveKind;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Builder for creating test configurations
pub struct ConfigBuilder {
    temp_dir: TempDir,
    config: Config,
}

impl ConfigBuilder {
    /// Create a new ConfigBuilder with no sources or destinations.
    ///
    /// Workspaces are created under `<temp>/workspaces` so tests can check cleanup.
    pub fn new(app: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let workspace_root = temp_dir.path().join("workspaces");
        fs::create_dir_all(&workspace_root).expect("Failed to create workspace root");

        let config = Config {
            app: app.to_string(),
            archive_type: ArchiveKind::Tar,
            workspace_root: Some(workspace_root),
            logging: LoggingSettings::default(),
            sources: vec![],
            destinations: vec![],
        };

        Self { temp_dir, config }
    }

    /// One raw-files source over two files in the builder's temp dir
    pub fn minimal() -> Self {
        let builder = Self::new("test-app");
        let first = builder.create_file("data/first.txt", "first");
        let second = builder.create_file("data/second.txt", "second");
        builder.add_files_source("config", &[first, second])
    }

    /// Create a file under the builder's temp dir
    pub fn create_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&path, content).expect("Failed to write file");
        path
    }

    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Set the combined archive kind
    pub fn with_archive_type(mut self, kind: ArchiveKind) -> Self {
        self.config.archive_type = kind;
        self
    }

    /// Log into `<temp>/logs`
    pub fn with_log_dir(mut self) -> Self {
        self.config.logging.directory = Some(self.temp_dir.path().join("logs"));
        self
    }

    pub fn add_files_source(mut self, backup_filename: &str, files: &[PathBuf]) -> Self {
        self.config.sources.push(SourceConfig::Files(RawFilesConfig {
            name: String::new(),
            backup_filename: backup_filename.to_string(),
            files: files.iter().map(|f| f.display().to_string()).collect(),
            archive_type: ArchiveKind::Tar,
        }));
        self
    }

    pub fn add_http_source(mut self, backup_filename: &str, url: &str) -> Self {
        self.config.sources.push(SourceConfig::Http(HttpSourceConfig {
            name: String::new(),
            backup_filename: backup_filename.to_string(),
            url: url.to_string(),
            method: "GET".to_string(),
            request_params: Default::default(),
        }));
        self
    }

    /// PostgreSQL source without credentials; they resolve from `PG_{NAME}_*`
    pub fn add_postgres_source(mut self, name: &str, database: &str) -> Self {
        self.config.sources.push(SourceConfig::Postgres(DatabaseSourceConfig {
            name: name.to_string(),
            backup_filename: name.replace(' ', "_"),
            host: "localhost".to_string(),
            database: Some(database.to_string()),
            ..Default::default()
        }));
        self
    }

    /// MySQL source dumping every database with explicit credentials
    pub fn add_mysql_source(mut self, name: &str) -> Self {
        self.config.sources.push(SourceConfig::Mysql(DatabaseSourceConfig {
            name: name.to_string(),
            backup_filename: name.replace(' ', "_"),
            host: "localhost".to_string(),
            username: Some("root".to_string()),
            password: Some("secret".to_string()),
            all_databases: true,
            ..Default::default()
        }));
        self
    }

    pub fn add_source(mut self, source: SourceConfig) -> Self {
        self.config.sources.push(source);
        self
    }

    /// S3 destination with explicit test credentials
    pub fn add_s3_destination(mut self, name: &str, bucket: &str, group: bool) -> Self {
        self.config.destinations.push(DestinationConfig::S3(S3DestinationConfig {
            name: name.to_string(),
            group,
            bucket: bucket.to_string(),
            region: "us-east-1".to_string(),
            endpoint_url: None,
            access_key_id: Some("test-key".to_string()),
            secret_access_key: Some("test-secret".to_string()),
            prefix: None,
        }));
        self
    }

    /// Build the configuration (temp dir is dropped)
    pub fn build(self) -> Config {
        self.config
    }

    /// Write the configuration as `config.json` and keep the temp dir alive
    pub fn persist(self) -> (Config, PathBuf, TempDir) {
        let path = self.temp_dir.path().join("config.json");
        let json = serde_json::to_string_pretty(&self.config).expect("Failed to serialize config");
        fs::write(&path, json).expect("Failed to write config");
        (self.config, path, self.temp_dir)
    }

    /// Build the configuration and keep the temp dir alive
    pub fn build_with_dir(self) -> (Config, TempDir) {
        (self.config, self.temp_dir)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new("test-app")
    }
}
