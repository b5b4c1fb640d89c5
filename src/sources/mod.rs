//! Backup sources
//!
//! A source produces exactly one artifact file in the run workspace per
//! [`Source::backup`] call. Captures that fail in an expected way (dump tool
//! exits non-zero, endpoint answers 500) still return the artifact, marked
//! [`CaptureStatus::Degraded`]. `Err` means the run cannot continue.

mod database;
mod files;
mod http;

pub use database::{DatabaseEngine, DatabaseSelection, DatabaseSource};
pub use files::RawFilesSource;
pub use http::HttpSnapshotSource;

use crate::config::{ConfigError, SourceConfig};
use crate::utils::archive::ArchiveError;
use crate::utils::credentials::CredentialResolver;
use crate::utils::executor::CommandExecutor;
use crate::utils::http::HttpClient;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Outcome of capturing one artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureStatus {
    Complete,
    /// The file exists but may be empty or hold an error payload
    Degraded { reason: String },
}

impl CaptureStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, CaptureStatus::Complete)
    }
}

impl fmt::Display for CaptureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureStatus::Complete => f.write_str("complete"),
            CaptureStatus::Degraded { reason } => write!(f, "degraded ({})", reason),
        }
    }
}

/// One file produced by one source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Name of the producing source
    pub source: String,
    pub path: PathBuf,
    pub status: CaptureStatus,
}

impl Artifact {
    pub fn complete(source: &str, path: PathBuf) -> Self {
        Self {
            source: source.to_string(),
            path,
            status: CaptureStatus::Complete,
        }
    }

    pub fn degraded(source: &str, path: PathBuf, reason: impl Into<String>) -> Self {
        Self {
            source: source.to_string(),
            path,
            status: CaptureStatus::Degraded {
                reason: reason.into(),
            },
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Cannot write artifact {path:?}: {source}")]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

/// Anything that can produce one artifact into a workspace
pub trait Source {
    fn name(&self) -> &str;

    /// Short kind label used in logs
    fn kind(&self) -> &'static str;

    fn backup(&self, workspace: &Path) -> Result<Artifact, SourceError>;
}

/// Closed set of configured sources
pub enum BackupSource {
    Database(DatabaseSource),
    Files(RawFilesSource),
    Http(HttpSnapshotSource),
}

impl BackupSource {
    /// Build a source from its configuration, resolving missing credentials
    pub fn from_config(
        config: &SourceConfig,
        resolver: &dyn CredentialResolver,
        executor: Arc<dyn CommandExecutor>,
        http: Arc<dyn HttpClient>,
    ) -> Result<Self, ConfigError> {
        Ok(match config {
            SourceConfig::Mysql(db) => BackupSource::Database(DatabaseSource::from_config(
                DatabaseEngine::Mysql,
                db,
                resolver,
                executor,
            )?),
            SourceConfig::Postgres(db) => BackupSource::Database(DatabaseSource::from_config(
                DatabaseEngine::Postgres,
                db,
                resolver,
                executor,
            )?),
            SourceConfig::Files(files) => BackupSource::Files(RawFilesSource::from_config(files)),
            SourceConfig::Http(snapshot) => {
                BackupSource::Http(HttpSnapshotSource::from_config(snapshot, http))
            }
        })
    }

    fn inner(&self) -> &dyn Source {
        match self {
            BackupSource::Database(s) => s,
            BackupSource::Files(s) => s,
            BackupSource::Http(s) => s,
        }
    }
}

impl Source for BackupSource {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn kind(&self) -> &'static str {
        self.inner().kind()
    }

    fn backup(&self, workspace: &Path) -> Result<Artifact, SourceError> {
        self.inner().backup(workspace)
    }
}

/// Create (or truncate) the artifact file so the path exists whatever happens next
pub(crate) fn create_artifact_file(path: &Path) -> Result<std::fs::File, SourceError> {
    std::fs::File::create(path).map_err(|source| SourceError::Workspace {
        path: path.to_path_buf(),
        source,
    })
}
