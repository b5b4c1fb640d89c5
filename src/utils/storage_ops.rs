//! Object storage abstraction for testability
//!
//! [`S3ObjectStore`] drives the async AWS SDK on a private current-thread Tokio
//! runtime so callers stay synchronous.

use anyhow::{anyhow, Context, Result};
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use std::fmt;
use std::path::Path;
use tokio::runtime::Runtime;
use tracing::debug;

/// Region that takes no location constraint on bucket creation
pub const DEFAULT_REGION: &str = "us-east-1";

/// Abstraction for object storage operations, enabling mocking in tests
pub trait ObjectStore: Send + Sync {
    /// `Ok(false)` only when the store reports the bucket as not found
    fn bucket_exists(&self, bucket: &str) -> Result<bool>;

    fn create_bucket(&self, bucket: &str) -> Result<()>;

    /// Upload the file at `path` under `key`
    fn put_object(&self, bucket: &str, key: &str, path: &Path) -> Result<()>;
}

/// Resolved connection settings for an S3-compatible store
#[derive(Clone, PartialEq, Eq)]
pub struct S3Settings {
    pub region: String,
    pub endpoint_url: Option<String>,
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl fmt::Debug for S3Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Settings")
            .field("region", &self.region)
            .field("endpoint_url", &self.endpoint_url)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .finish()
    }
}

/// `aws-sdk-s3` backed store
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    runtime: Runtime,
    region: String,
}

impl S3ObjectStore {
    pub fn new(settings: &S3Settings) -> Result<Self> {
        let credentials = Credentials::new(
            &settings.access_key_id,
            &settings.secret_access_key,
            None,
            None,
            "backup-relay",
        );

        let mut builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .credentials_provider(credentials);
        if let Some(endpoint) = &settings.endpoint_url {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to start storage runtime")?;

        Ok(Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
            runtime,
            region: settings.region.clone(),
        })
    }
}

impl ObjectStore for S3ObjectStore {
    fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        let result = self
            .runtime
            .block_on(self.client.head_bucket().bucket(bucket).send());

        match result {
            Ok(_) => Ok(true),
            Err(err) => {
                let not_found = err
                    .as_service_error()
                    .map(|e| e.is_not_found())
                    .unwrap_or(false)
                    || err
                        .raw_response()
                        .map(|r| r.status().as_u16() == 404)
                        .unwrap_or(false);
                if not_found {
                    debug!("Bucket {} not found", bucket);
                    Ok(false)
                } else {
                    Err(anyhow!(
                        "Failed to check bucket {}: {}",
                        bucket,
                        DisplayErrorContext(&err)
                    ))
                }
            }
        }
    }

    fn create_bucket(&self, bucket: &str) -> Result<()> {
        let mut request = self.client.create_bucket().bucket(bucket);
        if self.region != DEFAULT_REGION {
            let configuration = CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                .build();
            request = request.create_bucket_configuration(configuration);
        }

        self.runtime
            .block_on(request.send())
            .map_err(|err| {
                anyhow!("Failed to create bucket {}: {}", bucket, DisplayErrorContext(&err))
            })?;
        Ok(())
    }

    fn put_object(&self, bucket: &str, key: &str, path: &Path) -> Result<()> {
        self.runtime.block_on(async {
            let body = ByteStream::from_path(path)
                .await
                .with_context(|| format!("Failed to read {:?}", path))?;

            self.client
                .put_object()
                .bucket(bucket)
                .key(key)
                .body(body)
                .send()
                .await
                .map_err(|err| {
                    anyhow!(
                        "Failed to upload {} to bucket {}: {}",
                        key,
                        bucket,
                        DisplayErrorContext(&err)
                    )
                })?;
            Ok(())
        })
    }
}

/// In-memory object store for testing
/// Available for use in external test crates
pub mod mock {
    use super::*;
    use std::collections::HashSet;
    use std::fs;
    use std::sync::{Arc, Mutex};

    /// Recorded store operation
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum StorageCall {
        BucketExists(String),
        CreateBucket(String),
        PutObject {
            bucket: String,
            key: String,
            /// File contents at upload time
            contents: Vec<u8>,
        },
    }

    #[derive(Clone, Default)]
    pub struct MockObjectStore {
        pub calls: Arc<Mutex<Vec<StorageCall>>>,
        buckets: Arc<Mutex<HashSet<String>>>,
        probe_error: Option<String>,
        create_error: Option<String>,
        put_error: Option<String>,
    }

    impl MockObjectStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Start with `bucket` already present
        pub fn with_bucket(self, bucket: &str) -> Self {
            self.buckets.lock().unwrap().insert(bucket.to_string());
            self
        }

        pub fn failing_probe(mut self, message: &str) -> Self {
            self.probe_error = Some(message.to_string());
            self
        }

        pub fn failing_create(mut self, message: &str) -> Self {
            self.create_error = Some(message.to_string());
            self
        }

        pub fn failing_put(mut self, message: &str) -> Self {
            self.put_error = Some(message.to_string());
            self
        }

        pub fn get_calls(&self) -> Vec<StorageCall> {
            self.calls.lock().unwrap().clone()
        }

        /// Keys uploaded, in order
        pub fn put_keys(&self) -> Vec<String> {
            self.get_calls()
                .into_iter()
                .filter_map(|call| match call {
                    StorageCall::PutObject { key, .. } => Some(key),
                    _ => None,
                })
                .collect()
        }

        pub fn created_buckets(&self) -> Vec<String> {
            self.get_calls()
                .into_iter()
                .filter_map(|call| match call {
                    StorageCall::CreateBucket(bucket) => Some(bucket),
                    _ => None,
                })
                .collect()
        }

        /// Contents uploaded under `key`
        pub fn object(&self, key: &str) -> Option<Vec<u8>> {
            self.get_calls().into_iter().find_map(|call| match call {
                StorageCall::PutObject {
                    key: k, contents, ..
                } if k == key => Some(contents),
                _ => None,
            })
        }

        fn record(&self, call: StorageCall) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl ObjectStore for MockObjectStore {
        fn bucket_exists(&self, bucket: &str) -> Result<bool> {
            self.record(StorageCall::BucketExists(bucket.to_string()));
            if let Some(message) = &self.probe_error {
                anyhow::bail!("{}", message);
            }
            Ok(self.buckets.lock().unwrap().contains(bucket))
        }

        fn create_bucket(&self, bucket: &str) -> Result<()> {
            self.record(StorageCall::CreateBucket(bucket.to_string()));
            if let Some(message) = &self.create_error {
                anyhow::bail!("{}", message);
            }
            self.buckets.lock().unwrap().insert(bucket.to_string());
            Ok(())
        }

        fn put_object(&self, bucket: &str, key: &str, path: &Path) -> Result<()> {
            let contents = fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
            self.record(StorageCall::PutObject {
                bucket: bucket.to_string(),
                key: key.to_string(),
                contents,
            });
            if let Some(message) = &self.put_error {
                anyhow::bail!("{}", message);
            }
            Ok(())
        }
    }
}
