use crate::utils::archive::ArchiveKind;
use crate::utils::http::RequestOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Config {
    /// Application name, used for the workspace and the combined archive name
    pub app: String,

    /// Kind of the combined archive
    #[serde(default)]
    pub archive_type: ArchiveKind,

    /// Parent directory for run workspaces (system temp dir when absent)
    #[serde(default)]
    pub workspace_root: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingSettings,

    /// Sources, in run order
    #[serde(default)]
    pub sources: Vec<SourceConfig>,

    /// Destinations, in upload order
    #[serde(default)]
    pub destinations: Vec<DestinationConfig>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingSettings {
    /// Log file directory; console-only logging when absent
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_max_files")]
    pub max_files: u32,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: None,
            level: default_log_level(),
            max_files: default_log_max_files(),
        }
    }
}

/// Source configuration, tagged by `type`
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceConfig {
    Mysql(DatabaseSourceConfig),
    Postgres(DatabaseSourceConfig),
    Files(RawFilesConfig),
    Http(HttpSourceConfig),
}

impl SourceConfig {
    /// The `type` tag
    pub fn kind(&self) -> &'static str {
        match self {
            SourceConfig::Mysql(_) => "mysql",
            SourceConfig::Postgres(_) => "postgres",
            SourceConfig::Files(_) => "files",
            SourceConfig::Http(_) => "http",
        }
    }

    /// Name used for logs and credential lookup
    pub fn name(&self) -> &str {
        match self {
            SourceConfig::Mysql(c) | SourceConfig::Postgres(c) => c.display_name(),
            SourceConfig::Files(c) => c.display_name(),
            SourceConfig::Http(c) => c.display_name(),
        }
    }

    pub fn backup_filename(&self) -> &str {
        match self {
            SourceConfig::Mysql(c) | SourceConfig::Postgres(c) => &c.backup_filename,
            SourceConfig::Files(c) => &c.backup_filename,
            SourceConfig::Http(c) => &c.backup_filename,
        }
    }
}

/// Falls back to the backup filename when no name is configured
fn name_or<'a>(name: &'a str, backup_filename: &'a str) -> &'a str {
    if name.is_empty() {
        backup_filename
    } else {
        name
    }
}

/// MySQL / PostgreSQL dump source
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct DatabaseSourceConfig {
    #[serde(default)]
    pub name: String,
    pub backup_filename: String,
    pub host: String,
    /// Engine default when absent (3306 / 5432)
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub all_databases: bool,

    /// Executable overrides
    #[serde(default)]
    pub mysql_dump_bin: Option<String>,
    #[serde(default)]
    pub pg_dump_bin: Option<String>,
    #[serde(default)]
    pub pg_dumpall_bin: Option<String>,
}

impl DatabaseSourceConfig {
    pub fn display_name(&self) -> &str {
        name_or(&self.name, &self.backup_filename)
    }
}

/// Explicit list of files and directories packed into one archive
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct RawFilesConfig {
    #[serde(default)]
    pub name: String,
    pub backup_filename: String,
    pub files: Vec<String>,
    #[serde(default)]
    pub archive_type: ArchiveKind,
}

impl RawFilesConfig {
    pub fn display_name(&self) -> &str {
        name_or(&self.name, &self.backup_filename)
    }
}

/// Snapshot of one HTTP endpoint response
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct HttpSourceConfig {
    #[serde(default)]
    pub name: String,
    pub backup_filename: String,
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub request_params: RequestOptions,
}

impl HttpSourceConfig {
    pub fn display_name(&self) -> &str {
        name_or(&self.name, &self.backup_filename)
    }
}

/// Destination configuration, tagged by `type`
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DestinationConfig {
    S3(S3DestinationConfig),
}

impl DestinationConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            DestinationConfig::S3(_) => "s3",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            DestinationConfig::S3(c) => &c.name,
        }
    }

    pub fn is_grouped(&self) -> bool {
        match self {
            DestinationConfig::S3(c) => c.group,
        }
    }
}

/// S3-compatible object storage
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct S3DestinationConfig {
    pub name: String,
    /// Receive the combined archive instead of the per-source artifacts
    #[serde(default)]
    pub group: bool,
    pub bucket: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub endpoint_url: Option<String>,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
}

// Default value functions

fn default_log_level() -> String { "info".to_string() }
fn default_log_max_files() -> u32 { 10 }
fn default_method() -> String { "GET".to_string() }
fn default_region() -> String { "us-east-1".to_string() }
