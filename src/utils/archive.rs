//! Tar and zip packing of arbitrary path lists
//!
//! Every member is stored under its base name, so unrelated paths such as
//! `/etc/app.conf` and `~/data` end up side by side at the archive root.
//! Directories are stored recursively beneath their base name.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Archive container format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveKind {
    #[default]
    Tar,
    Zip,
}

impl ArchiveKind {
    /// File extension, without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveKind::Tar => "tar",
            ArchiveKind::Zip => "zip",
        }
    }
}

impl fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Archive member is not readable: {path:?}: {source}")]
    UnreadableMember {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Archive member has no file name: {0:?}")]
    NoFileName(PathBuf),

    #[error("Two archive members share the name '{0}'")]
    DuplicateMember(String),

    #[error("Failed to write archive {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Zip error for {path:?}: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

pub type Result<T> = std::result::Result<T, ArchiveError>;

struct Member<'a> {
    path: &'a Path,
    name: String,
    is_dir: bool,
}

/// Pack `members` into a single `kind` archive at `output`.
///
/// All members are checked before anything is written. On failure no partial
/// archive is left behind.
pub fn pack(members: &[PathBuf], kind: ArchiveKind, output: &Path) -> Result<()> {
    let checked = members
        .iter()
        .map(|path| check_member(path))
        .collect::<Result<Vec<_>>>()?;

    let mut seen = HashSet::new();
    if let Some(duplicate) = checked.iter().find(|m| !seen.insert(m.name.as_str())) {
        return Err(ArchiveError::DuplicateMember(duplicate.name.clone()));
    }

    debug!("Packing {} members into {:?}", checked.len(), output);

    let result = match kind {
        ArchiveKind::Tar => write_tar(&checked, output),
        ArchiveKind::Zip => write_zip(&checked, output),
    };

    match result {
        Ok(()) => {
            info!("Created {} archive {:?} with {} members", kind, output, checked.len());
            Ok(())
        }
        Err(e) => {
            let _ = fs::remove_file(output);
            Err(e)
        }
    }
}

/// Top-level entry names of an archive, in archive order.
///
/// Repeated top-level names are kept; entries nested under a directory member
/// only report that directory once.
pub fn list_members(archive: &Path, kind: ArchiveKind) -> Result<Vec<String>> {
    let io_err = |source| ArchiveError::Io {
        path: archive.to_path_buf(),
        source,
    };
    let file = File::open(archive).map_err(io_err)?;
    let mut names: Vec<String> = Vec::new();
    let mut push = |name: String, nested: bool| {
        if name.is_empty() || (nested && names.contains(&name)) {
            return;
        }
        names.push(name);
    };

    match kind {
        ArchiveKind::Tar => {
            let mut tar = tar::Archive::new(file);
            for entry in tar.entries().map_err(io_err)? {
                let entry = entry.map_err(io_err)?;
                let path = entry.path().map_err(io_err)?;
                let mut components = path
                    .components()
                    .filter(|c| matches!(c, Component::Normal(_)));
                if let Some(first) = components.next() {
                    let nested = components.next().is_some();
                    push(first.as_os_str().to_string_lossy().into_owned(), nested);
                }
            }
        }
        ArchiveKind::Zip => {
            let zip_err = |source| ArchiveError::Zip {
                path: archive.to_path_buf(),
                source,
            };
            let mut zip = ZipArchive::new(file).map_err(zip_err)?;
            for index in 0..zip.len() {
                let entry = zip.by_index(index).map_err(zip_err)?;
                let mut parts = entry.name().split('/').filter(|p| !p.is_empty());
                if let Some(first) = parts.next() {
                    let nested = parts.next().is_some();
                    push(first.to_string(), nested);
                }
            }
        }
    }

    Ok(names)
}

fn check_member(path: &Path) -> Result<Member<'_>> {
    let unreadable = |source| ArchiveError::UnreadableMember {
        path: path.to_path_buf(),
        source,
    };

    let metadata = fs::metadata(path).map_err(unreadable)?;
    if metadata.is_dir() {
        fs::read_dir(path).map_err(unreadable)?;
    } else {
        File::open(path).map_err(unreadable)?;
    }

    let name = path
        .file_name()
        .ok_or_else(|| ArchiveError::NoFileName(path.to_path_buf()))?
        .to_string_lossy()
        .into_owned();

    Ok(Member {
        path,
        name,
        is_dir: metadata.is_dir(),
    })
}

fn write_tar(members: &[Member<'_>], output: &Path) -> Result<()> {
    let io_err = |source| ArchiveError::Io {
        path: output.to_path_buf(),
        source,
    };

    let file = File::create(output).map_err(io_err)?;
    let mut builder = tar::Builder::new(file);

    for member in members {
        let appended = if member.is_dir {
            builder.append_dir_all(&member.name, member.path)
        } else {
            builder.append_path_with_name(member.path, &member.name)
        };
        appended.map_err(|source| ArchiveError::UnreadableMember {
            path: member.path.to_path_buf(),
            source,
        })?;
    }

    let file = builder.into_inner().map_err(io_err)?;
    file.sync_all().map_err(io_err)
}

fn write_zip(members: &[Member<'_>], output: &Path) -> Result<()> {
    let file = File::create(output).map_err(|source| ArchiveError::Io {
        path: output.to_path_buf(),
        source,
    })?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for member in members {
        if member.is_dir {
            add_zip_dir(&mut writer, member.path, &member.name, options, output)?;
        } else {
            add_zip_file(&mut writer, member.path, &member.name, options, output)?;
        }
    }

    writer.finish().map_err(|source| ArchiveError::Zip {
        path: output.to_path_buf(),
        source,
    })?;
    Ok(())
}

fn add_zip_file(
    writer: &mut ZipWriter<File>,
    path: &Path,
    name: &str,
    options: SimpleFileOptions,
    output: &Path,
) -> Result<()> {
    writer
        .start_file(name, options)
        .map_err(|source| ArchiveError::Zip {
            path: output.to_path_buf(),
            source,
        })?;

    let mut source_file = File::open(path).map_err(|source| ArchiveError::UnreadableMember {
        path: path.to_path_buf(),
        source,
    })?;
    io::copy(&mut source_file, writer).map_err(|source| ArchiveError::Io {
        path: output.to_path_buf(),
        source,
    })?;
    Ok(())
}

fn add_zip_dir(
    writer: &mut ZipWriter<File>,
    dir: &Path,
    name: &str,
    options: SimpleFileOptions,
    output: &Path,
) -> Result<()> {
    let unreadable = |source| ArchiveError::UnreadableMember {
        path: dir.to_path_buf(),
        source,
    };

    writer
        .add_directory(format!("{}/", name), options)
        .map_err(|source| ArchiveError::Zip {
            path: output.to_path_buf(),
            source,
        })?;

    let mut children = fs::read_dir(dir)
        .map_err(unreadable)?
        .collect::<io::Result<Vec<_>>>()
        .map_err(unreadable)?;
    children.sort_by_key(|entry| entry.file_name());

    for child in children {
        let child_name = format!("{}/{}", name, child.file_name().to_string_lossy());
        let child_path = child.path();
        if fs::metadata(&child_path).map_err(unreadable)?.is_dir() {
            add_zip_dir(writer, &child_path, &child_name, options, output)?;
        } else {
            add_zip_file(writer, &child_path, &child_name, options, output)?;
        }
    }

    Ok(())
}
