//! Run outcome types

use crate::sources::{CaptureStatus, SourceError};
use crate::utils::archive::ArchiveError;
use std::fmt;
use std::path::PathBuf;

/// Orchestrator lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    WorkspaceOpen,
    SourcesRunning,
    Aggregating,
    DistributingUploads,
    WorkspaceClosed,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Idle => "idle",
            RunPhase::WorkspaceOpen => "workspace open",
            RunPhase::SourcesRunning => "sources running",
            RunPhase::Aggregating => "aggregating",
            RunPhase::DistributingUploads => "distributing uploads",
            RunPhase::WorkspaceClosed => "workspace closed",
        };
        f.write_str(name)
    }
}

/// One per-source artifact, as reported after the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRecord {
    pub source: String,
    pub file_name: String,
    pub status: CaptureStatus,
}

/// Files a destination received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub destination: String,
    pub grouped: bool,
    pub files: Vec<String>,
}

/// Summary of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub app: String,
    /// Workspace used by the run; removed by the time the report is returned
    pub workspace: PathBuf,
    pub artifacts: Vec<ArtifactRecord>,
    pub combined_archive: String,
    pub uploads: Vec<UploadOutcome>,
}

impl RunReport {
    /// Artifacts whose capture failed
    pub fn degraded(&self) -> impl Iterator<Item = &ArtifactRecord> {
        self.artifacts.iter().filter(|a| !a.status.is_complete())
    }

    pub fn is_fully_captured(&self) -> bool {
        self.degraded().next().is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFailure {
    pub destination: String,
    pub error: String,
}

impl fmt::Display for UploadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.destination, self.error)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Failed to create workspace: {0}")]
    Workspace(#[source] std::io::Error),

    #[error("Source '{name}' failed: {error}")]
    Source {
        name: String,
        #[source]
        error: SourceError,
    },

    #[error("Failed to create combined archive: {0}")]
    Aggregation(#[source] ArchiveError),

    #[error("Upload failed for {} destination(s): {}", .0.len(), join_failures(.0))]
    Uploads(Vec<UploadFailure>),
}

impl RunError {
    /// Phase the run was in when it failed
    pub fn phase(&self) -> RunPhase {
        match self {
            RunError::Workspace(_) => RunPhase::Idle,
            RunError::Source { .. } => RunPhase::SourcesRunning,
            RunError::Aggregation(_) => RunPhase::Aggregating,
            RunError::Uploads(_) => RunPhase::DistributingUploads,
        }
    }
}

fn join_failures(failures: &[UploadFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
