use super::types::*;
use crate::destinations::{BackupDestination, ObjectStorageDestination};
use crate::sources::BackupSource;
use crate::utils::credentials::CredentialResolver;
use crate::utils::executor::CommandExecutor;
use crate::utils::http::HttpClient;
use crate::utils::storage_ops::{ObjectStore, S3ObjectStore, S3Settings};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to parse config file: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Source '{0}': missing either database name or all_databases option")]
    MissingDatabaseSelector(String),

    #[error("'{entity}': missing credential, set it in the config or in {variable}")]
    MissingCredential { entity: String, variable: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// On-disk configuration format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// `.json` files are JSON, anything else is TOML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ConfigFormat::Json,
            _ => ConfigFormat::Toml,
        }
    }
}

/// Load and validate configuration from a TOML or JSON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    parse_config(&contents, ConfigFormat::from_path(path))
}

/// Parse and validate configuration text
pub fn parse_config(contents: &str, format: ConfigFormat) -> Result<Config> {
    let config: Config = match format {
        ConfigFormat::Toml => toml::from_str(contents)?,
        ConfigFormat::Json => serde_json::from_str(contents)?,
    };
    validate_config(&config)?;
    Ok(config)
}

/// Validate the configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.app.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "'app' must not be empty".to_string(),
        ));
    }

    if config.sources.is_empty() {
        return Err(ConfigError::ValidationError(
            "No sources defined".to_string(),
        ));
    }

    let mut source_names = HashSet::new();
    for source in &config.sources {
        if source.backup_filename().trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "Source '{}' ({}): backup_filename must not be empty",
                source.name(),
                source.kind()
            )));
        }
        if !source_names.insert(source.name()) {
            return Err(ConfigError::ValidationError(format!(
                "Duplicate source name: {}",
                source.name()
            )));
        }
    }

    let mut destination_names = HashSet::new();
    for destination in &config.destinations {
        if destination.name().trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "Destination of type '{}' has no name",
                destination.kind()
            )));
        }
        if !destination_names.insert(destination.name()) {
            return Err(ConfigError::ValidationError(format!(
                "Duplicate destination name: {}",
                destination.name()
            )));
        }
    }

    Ok(())
}

/// Build every configured source, in configuration order
pub fn build_sources(
    config: &Config,
    resolver: &dyn CredentialResolver,
    executor: Arc<dyn CommandExecutor>,
    http: Arc<dyn HttpClient>,
) -> Result<Vec<BackupSource>> {
    config
        .sources
        .iter()
        .map(|source| BackupSource::from_config(source, resolver, executor.clone(), http.clone()))
        .collect()
}

/// Build every configured destination against real object storage
pub fn build_destinations(
    config: &Config,
    resolver: &dyn CredentialResolver,
) -> Result<Vec<BackupDestination>> {
    build_destinations_with(config, resolver, |settings| {
        Ok(Arc::new(S3ObjectStore::new(settings)?) as Arc<dyn ObjectStore>)
    })
}

/// Build every configured destination, creating object stores with `store_factory`
pub fn build_destinations_with<F>(
    config: &Config,
    resolver: &dyn CredentialResolver,
    store_factory: F,
) -> Result<Vec<BackupDestination>>
where
    F: Fn(&S3Settings) -> anyhow::Result<Arc<dyn ObjectStore>>,
{
    config
        .destinations
        .iter()
        .map(|destination| match destination {
            DestinationConfig::S3(s3) => {
                let settings = ObjectStorageDestination::resolve_settings(s3, resolver)?;
                let store = store_factory(&settings).map_err(|e| {
                    ConfigError::ValidationError(format!(
                        "Destination '{}': failed to create storage client: {:#}",
                        s3.name, e
                    ))
                })?;
                Ok(BackupDestination::ObjectStorage(
                    ObjectStorageDestination::from_config(s3, store),
                ))
            }
        })
        .collect()
}
