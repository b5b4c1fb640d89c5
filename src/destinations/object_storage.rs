use super::Destination;
use crate::config::{ConfigError, S3DestinationConfig};
use crate::utils::credentials::{resolve_credential, CredentialResolver};
use crate::utils::storage_ops::{ObjectStore, S3Settings};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const CREDENTIAL_PREFIX: &str = "S3";

/// S3-compatible bucket
pub struct ObjectStorageDestination {
    name: String,
    group: bool,
    bucket: String,
    prefix: Option<String>,
    store: Arc<dyn ObjectStore>,
}

impl ObjectStorageDestination {
    pub fn new(
        name: impl Into<String>,
        group: bool,
        bucket: impl Into<String>,
        prefix: Option<String>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            name: name.into(),
            group,
            bucket: bucket.into(),
            prefix,
            store,
        }
    }

    pub fn from_config(config: &S3DestinationConfig, store: Arc<dyn ObjectStore>) -> Self {
        Self::new(
            &config.name,
            config.group,
            &config.bucket,
            config.prefix.clone(),
            store,
        )
    }

    /// Connection settings with credentials resolved from
    /// `S3_{NAME}_ACCESS_KEY_ID` / `S3_{NAME}_SECRET_ACCESS_KEY` when not configured
    pub fn resolve_settings(
        config: &S3DestinationConfig,
        resolver: &dyn CredentialResolver,
    ) -> Result<S3Settings, ConfigError> {
        let access_key_id = resolve_credential(
            config.access_key_id.as_deref(),
            resolver,
            CREDENTIAL_PREFIX,
            &config.name,
            "ACCESS_KEY_ID",
        )?;
        let secret_access_key = resolve_credential(
            config.secret_access_key.as_deref(),
            resolver,
            CREDENTIAL_PREFIX,
            &config.name,
            "SECRET_ACCESS_KEY",
        )?;

        Ok(S3Settings {
            region: config.region.clone(),
            endpoint_url: config.endpoint_url.clone(),
            access_key_id,
            secret_access_key,
        })
    }

    /// `{prefix}/{basename}`, or the bare base name without a prefix
    pub fn object_key(&self, path: &Path) -> Result<String> {
        let file_name = path
            .file_name()
            .with_context(|| format!("Artifact has no file name: {:?}", path))?
            .to_string_lossy();

        Ok(match self.prefix.as_deref().map(|p| p.trim_matches('/')) {
            Some(prefix) if !prefix.is_empty() => format!("{}/{}", prefix, file_name),
            _ => file_name.into_owned(),
        })
    }

    fn ensure_bucket(&self) -> Result<()> {
        if self.store.bucket_exists(&self.bucket)? {
            return Ok(());
        }

        info!("Bucket {} does not exist, creating it", self.bucket);
        self.store.create_bucket(&self.bucket)
    }
}

impl Destination for ObjectStorageDestination {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "s3"
    }

    fn is_grouped(&self) -> bool {
        self.group
    }

    fn upload(&self, artifacts: &[PathBuf]) -> Result<()> {
        self.ensure_bucket()?;

        for artifact in artifacts {
            let key = self.object_key(artifact)?;
            debug!("Uploading {:?} to {}/{}", artifact, self.bucket, key);
            self.store
                .put_object(&self.bucket, &key, artifact)
                .with_context(|| format!("Upload of {} to '{}' failed", key, self.name))?;
            info!("✓ Uploaded {} to {}", key, self.name);
        }

        Ok(())
    }
}
