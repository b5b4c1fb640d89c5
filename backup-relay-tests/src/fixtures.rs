//! Test fixtures and sample data
//!
//! Provides configuration templates and archive inspection helpers.

use backup_relay::utils::archive::ArchiveKind;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Config exercising every source type, TOML flavor
pub fn full_config_toml() -> &'static str {
    r#"
app = "my-app"
archive_type = "zip"

[logging]
level = "debug"
max_files = 3

[[sources]]
type = "postgres"
name = "main db"
backup_filename = "main"
host = "localhost"
database = "app"

[[sources]]
type = "mysql"
backup_filename = "legacy"
host = "mysql.internal"
port = 3307
username = "root"
password = "secret"
all_databases = true

[[sources]]
type = "files"
backup_filename = "config"
files = ["~/app/config.toml", "/etc/app"]

[[sources]]
type = "http"
backup_filename = "health"
url = "http://localhost:8080/health"
method = "post"

[sources.request_params]
timeout_seconds = 10
json = { deep = true }

[sources.request_params.headers]
Authorization = "Bearer token"

[[destinations]]
type = "s3"
name = "contabo"
bucket = "backups"
region = "eu-central-1"
endpoint_url = "https://eu2.contabostorage.com"
prefix = "my-app"
group = true

[[destinations]]
type = "s3"
name = "aws"
bucket = "raw-backups"
"#
}

/// Same pipeline as JSON, files and http only
pub fn minimal_config_json() -> &'static str {
    r#"{
  "app": "my-app",
  "sources": [
    {"type": "files", "backup_filename": "config", "files": ["/etc/hosts"]},
    {"type": "http", "name": "api", "backup_filename": "status", "url": "http://localhost/status"}
  ],
  "destinations": [
    {"type": "s3", "name": "remote", "bucket": "backups"}
  ]
}"#
}

/// Name and contents of every file entry in an archive
pub fn archive_contents(archive: &Path, kind: ArchiveKind) -> BTreeMap<String, Vec<u8>> {
    let file = File::open(archive).expect("Failed to open archive");
    let mut contents = BTreeMap::new();

    match kind {
        ArchiveKind::Tar => {
            let mut tar = tar::Archive::new(file);
            for entry in tar.entries().expect("Failed to read tar") {
                let mut entry = entry.expect("Failed to read tar entry");
                if !entry.header().entry_type().is_file() {
                    continue;
                }
                let name = entry.path().expect("Bad entry path").display().to_string();
                let mut data = Vec::new();
                entry.read_to_end(&mut data).expect("Failed to read tar entry");
                contents.insert(name, data);
            }
        }
        ArchiveKind::Zip => {
            let mut zip = zip::ZipArchive::new(file).expect("Failed to read zip");
            for index in 0..zip.len() {
                let mut entry = zip.by_index(index).expect("Failed to read zip entry");
                if entry.is_dir() {
                    continue;
                }
                let name = entry.name().to_string();
                let mut data = Vec::new();
                entry.read_to_end(&mut data).expect("Failed to read zip entry");
                contents.insert(name, data);
            }
        }
    }

    contents
}

/// Same as [`archive_contents`] for an archive held in memory
pub fn archive_contents_from_bytes(bytes: &[u8], kind: ArchiveKind) -> BTreeMap<String, Vec<u8>> {
    let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join(format!("archive.{}", kind.extension()));
    std::fs::write(&path, bytes).expect("Failed to write archive");
    archive_contents(&path, kind)
}
