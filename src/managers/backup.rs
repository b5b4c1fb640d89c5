//! Backup manager - orchestrates a backup run
//!
//! A run opens a private workspace, asks every source for its artifact,
//! packs all artifacts into one combined archive, and hands each destination
//! either the combined archive (grouped) or the per-source artifacts. The
//! workspace is removed on every exit path.

use super::report::{ArtifactRecord, RunError, RunPhase, RunReport, UploadFailure, UploadOutcome};
use crate::config::{self, Config};
use crate::destinations::Destination;
use crate::sources::{Artifact, CaptureStatus, Source};
use crate::utils::archive::{self, ArchiveKind};
use crate::utils::credentials::EnvResolver;
use crate::utils::executor::RealExecutor;
use crate::utils::http::ReqwestClient;
use crate::utils::timestamp::{artifact_file_name, now_iso};
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;
use tracing::{error, info, warn};

pub struct BackupManager {
    app: String,
    archive_kind: ArchiveKind,
    workspace_root: Option<PathBuf>,
    sources: Vec<Box<dyn Source>>,
    destinations: Vec<Box<dyn Destination>>,
}

impl BackupManager {
    /// Create new backup manager
    pub fn new(
        app: impl Into<String>,
        sources: Vec<Box<dyn Source>>,
        destinations: Vec<Box<dyn Destination>>,
    ) -> Self {
        Self {
            app: app.into(),
            archive_kind: ArchiveKind::default(),
            workspace_root: None,
            sources,
            destinations,
        }
    }

    /// Build the whole pipeline from configuration with the real collaborators
    pub fn from_config(config: &Config) -> Result<Self> {
        let resolver = EnvResolver::new();
        let http = Arc::new(ReqwestClient::new()?);

        let executor = Arc::new(RealExecutor::new());
        let sources = config::build_sources(config, &resolver, executor, http)?
            .into_iter()
            .map(|s| Box::new(s) as Box<dyn Source>)
            .collect();
        let destinations = config::build_destinations(config, &resolver)?
            .into_iter()
            .map(|d| Box::new(d) as Box<dyn Destination>)
            .collect();

        let mut manager = Self::new(&config.app, sources, destinations)
            .with_archive_kind(config.archive_type);
        if let Some(root) = &config.workspace_root {
            manager = manager.with_workspace_root(config::expand_tilde(root));
        }
        Ok(manager)
    }

    /// Kind of the combined archive
    pub fn with_archive_kind(mut self, kind: ArchiveKind) -> Self {
        self.archive_kind = kind;
        self
    }

    /// Create workspaces under `root` instead of the system temp dir
    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }

    pub fn sources(&self) -> &[Box<dyn Source>] {
        &self.sources
    }

    pub fn destinations(&self) -> &[Box<dyn Destination>] {
        &self.destinations
    }

    /// Run one backup
    pub fn run(&self) -> std::result::Result<RunReport, RunError> {
        let start_time = Instant::now();
        enter(RunPhase::Idle);
        info!("Starting backup for '{}'", self.app);

        let workspace = self.open_workspace().map_err(|e| {
            error!("Failed to create workspace: {}", e);
            RunError::Workspace(e)
        })?;
        let workspace_path = workspace.path().to_path_buf();
        enter(RunPhase::WorkspaceOpen);
        info!("Workspace: {:?}", workspace_path);

        let result = self.run_in(&workspace_path);

        enter(RunPhase::WorkspaceClosed);
        if let Err(e) = workspace.close() {
            warn!("Failed to remove workspace {:?}: {}", workspace_path, e);
        }

        match &result {
            Ok(report) => {
                info!(
                    "Backup for '{}' completed in {:.2}s ({} artifacts, {} destinations)",
                    self.app,
                    start_time.elapsed().as_secs_f64(),
                    report.artifacts.len(),
                    report.uploads.len()
                );
                for artifact in report.degraded() {
                    warn!("Artifact of '{}' is {}", artifact.source, artifact.status);
                }
            }
            Err(e) => {
                error!("Backup for '{}' failed during {}: {}", self.app, e.phase(), e);
            }
        }

        result
    }

    fn open_workspace(&self) -> std::io::Result<TempDir> {
        let prefix = format!("{}-backup-", self.app);
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);
        match &self.workspace_root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
    }

    fn run_in(&self, workspace: &Path) -> std::result::Result<RunReport, RunError> {
        enter(RunPhase::SourcesRunning);
        let artifacts = self.run_sources(workspace)?;

        enter(RunPhase::Aggregating);
        let combined = self.aggregate(workspace, &artifacts)?;

        enter(RunPhase::DistributingUploads);
        let uploads = self.distribute(&artifacts, &combined)?;

        Ok(RunReport {
            app: self.app.clone(),
            workspace: workspace.to_path_buf(),
            artifacts: artifacts
                .iter()
                .map(|artifact| ArtifactRecord {
                    source: artifact.source.clone(),
                    file_name: artifact.file_name(),
                    status: artifact.status.clone(),
                })
                .collect(),
            combined_archive: file_name(&combined),
            uploads,
        })
    }

    /// Run every source in order; a source error aborts the run
    fn run_sources(&self, workspace: &Path) -> std::result::Result<Vec<Artifact>, RunError> {
        let mut artifacts = Vec::with_capacity(self.sources.len());

        for source in &self.sources {
            info!("Backing up source '{}' ({})", source.name(), source.kind());

            let artifact = source.backup(workspace).map_err(|e| {
                error!("Source '{}' failed: {}", source.name(), e);
                RunError::Source {
                    name: source.name().to_string(),
                    error: e,
                }
            })?;

            match &artifact.status {
                CaptureStatus::Complete => {
                    info!("Source '{}' produced {}", source.name(), artifact.file_name())
                }
                CaptureStatus::Degraded { reason } => error!(
                    "Source '{}' produced a degraded artifact {}: {}",
                    source.name(),
                    artifact.file_name(),
                    reason
                ),
            }
            artifacts.push(artifact);
        }

        Ok(artifacts)
    }

    /// Pack every artifact, in source order, into the combined archive
    fn aggregate(
        &self,
        workspace: &Path,
        artifacts: &[Artifact],
    ) -> std::result::Result<PathBuf, RunError> {
        let prefix = format!("{}_backup", self.app);
        let combined = workspace.join(artifact_file_name(
            &prefix,
            &now_iso(),
            self.archive_kind.extension(),
        ));
        let members: Vec<PathBuf> = artifacts.iter().map(|a| a.path.clone()).collect();

        archive::pack(&members, self.archive_kind, &combined).map_err(|e| {
            error!("Failed to create combined archive: {}", e);
            RunError::Aggregation(e)
        })?;

        info!("Combined archive: {}", file_name(&combined));
        Ok(combined)
    }

    /// Attempt every destination; collect all failures
    fn distribute(
        &self,
        artifacts: &[Artifact],
        combined: &Path,
    ) -> std::result::Result<Vec<UploadOutcome>, RunError> {
        let grouped = vec![combined.to_path_buf()];
        let ungrouped: Vec<PathBuf> = artifacts.iter().map(|a| a.path.clone()).collect();

        let mut outcomes = Vec::new();
        let mut failures = Vec::new();

        for destination in &self.destinations {
            let files = if destination.is_grouped() {
                &grouped
            } else {
                &ungrouped
            };

            info!(
                "Uploading {} file(s) to destination '{}' ({})",
                files.len(),
                destination.name(),
                destination.kind()
            );

            match destination.upload(files) {
                Ok(()) => {
                    info!("Successfully uploaded to '{}'", destination.name());
                    outcomes.push(UploadOutcome {
                        destination: destination.name().to_string(),
                        grouped: destination.is_grouped(),
                        files: files.iter().map(|f| file_name(f)).collect(),
                    });
                }
                Err(e) => {
                    error!("Failed to upload to '{}': {:#}", destination.name(), e);
                    failures.push(UploadFailure {
                        destination: destination.name().to_string(),
                        error: format!("{:#}", e),
                    });
                }
            }
        }

        if !failures.is_empty() {
            return Err(RunError::Uploads(failures));
        }

        Ok(outcomes)
    }
}

fn enter(phase: RunPhase) {
    info!("Phase: {}", phase);
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
