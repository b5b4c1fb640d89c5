use super::{Artifact, Source, SourceError};
use crate::config::{expand_tilde, RawFilesConfig};
use crate::utils::archive::{self, ArchiveKind};
use crate::utils::timestamp::{artifact_file_name, now_iso};
use std::path::{Path, PathBuf};
use tracing::info;

/// Packs a fixed list of files and directories into one archive
#[derive(Debug, Clone)]
pub struct RawFilesSource {
    name: String,
    backup_filename: String,
    files: Vec<PathBuf>,
    archive_type: ArchiveKind,
}

impl RawFilesSource {
    pub fn from_config(config: &RawFilesConfig) -> Self {
        Self {
            name: config.display_name().to_string(),
            backup_filename: config.backup_filename.clone(),
            files: config
                .files
                .iter()
                .map(|file| expand_tilde(Path::new(file)))
                .collect(),
            archive_type: config.archive_type,
        }
    }

    /// Member paths after `~` expansion
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

impl Source for RawFilesSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "files"
    }

    fn backup(&self, workspace: &Path) -> Result<Artifact, SourceError> {
        let path = workspace.join(artifact_file_name(
            &self.backup_filename,
            &now_iso(),
            self.archive_type.extension(),
        ));

        info!("Archiving {} paths for '{}'", self.files.len(), self.name);
        archive::pack(&self.files, self.archive_type, &path)?;

        Ok(Artifact::complete(&self.name, path))
    }
}
