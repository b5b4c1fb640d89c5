//! Fake sources and destinations for pipeline tests

use anyhow::Result;
use backup_relay::destinations::Destination;
use backup_relay::sources::{Artifact, CaptureStatus, Source, SourceError};
use backup_relay::utils::timestamp::{artifact_file_name, now_iso};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Source writing a fixed text artifact
#[derive(Clone)]
pub struct FakeSource {
    name: String,
    content: String,
    status: CaptureStatus,
    fail: bool,
    /// Workspaces the source was asked to write into
    workspaces: Arc<Mutex<Vec<PathBuf>>>,
}

impl FakeSource {
    /// Complete source whose artifact contains its own name
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            content: name.to_string(),
            status: CaptureStatus::Complete,
            fail: false,
            workspaces: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_content(mut self, content: &str) -> Self {
        self.content = content.to_string();
        self
    }

    /// Return the artifact marked degraded
    pub fn degraded(mut self, reason: &str) -> Self {
        self.status = CaptureStatus::Degraded {
            reason: reason.to_string(),
        };
        self
    }

    /// Return a workspace error instead of an artifact
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn boxed(self) -> Box<dyn Source> {
        Box::new(self)
    }

    pub fn workspaces(&self) -> Vec<PathBuf> {
        self.workspaces.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.workspaces.lock().unwrap().len()
    }
}

impl Source for FakeSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "fake"
    }

    fn backup(&self, workspace: &Path) -> std::result::Result<Artifact, SourceError> {
        self.workspaces.lock().unwrap().push(workspace.to_path_buf());

        let path = workspace.join(artifact_file_name(&self.name, &now_iso(), "txt"));
        if self.fail {
            return Err(SourceError::Workspace {
                path,
                source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only workspace"),
            });
        }

        fs::write(&path, &self.content).map_err(|source| SourceError::Workspace {
            path: path.clone(),
            source,
        })?;

        Ok(Artifact {
            source: self.name.clone(),
            path,
            status: self.status.clone(),
        })
    }
}

/// What a destination was handed in one upload call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpload {
    /// Base names, in order
    pub files: Vec<String>,
    /// File contents at upload time
    pub contents: Vec<Vec<u8>>,
    /// Full paths as given
    pub paths: Vec<PathBuf>,
}

/// Destination recording every upload call
#[derive(Clone)]
pub struct RecordingDestination {
    name: String,
    grouped: bool,
    failure: Option<String>,
    uploads: Arc<Mutex<Vec<RecordedUpload>>>,
}

impl RecordingDestination {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            grouped: false,
            failure: None,
            uploads: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Receive the combined archive
    pub fn grouped(mut self) -> Self {
        self.grouped = true;
        self
    }

    /// Record the call, then fail with `message`
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn boxed(self) -> Box<dyn Destination> {
        Box::new(self)
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().unwrap().clone()
    }

    /// The single upload call, panicking when there were none or several
    pub fn only_upload(&self) -> RecordedUpload {
        let uploads = self.uploads();
        assert_eq!(uploads.len(), 1, "expected exactly one upload to '{}'", self.name);
        uploads.into_iter().next().unwrap()
    }
}

impl Destination for RecordingDestination {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "recording"
    }

    fn is_grouped(&self) -> bool {
        self.grouped
    }

    fn upload(&self, artifacts: &[PathBuf]) -> Result<()> {
        let upload = RecordedUpload {
            files: artifacts
                .iter()
                .map(|p| {
                    p.file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default()
                })
                .collect(),
            contents: artifacts
                .iter()
                .map(|p| fs::read(p).unwrap_or_default())
                .collect(),
            paths: artifacts.to_vec(),
        };
        self.uploads.lock().unwrap().push(upload);

        if let Some(message) = &self.failure {
            anyhow::bail!("{}", message);
        }
        Ok(())
    }
}
