//! Test utilities for backup-relay
//!
//! This crate provides shared test utilities, fake sources and destinations,
//! and helper functions for testing the backup pipeline.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use test_utils::{ConfigBuilder, FakeSource, RecordingDestination, TestContext};
//!
//! #[test]
//! fn my_test() {
//!     let ctx = TestContext::new();
//!     let destination = RecordingDestination::new("remote");
//!     let manager = BackupManager::new(
//!         "app",
//!         vec![FakeSource::new("db").boxed()],
//!         vec![destination.clone().boxed()],
//!     );
//!     // ... test code
//! }
//! ```

pub mod config_builder;
pub mod fakes;
pub mod fixtures;
pub mod http_stub;
pub mod test_context;

// Re-export commonly used items
pub use config_builder::ConfigBuilder;
pub use fakes::{FakeSource, RecordedUpload, RecordingDestination};
pub use fixtures::*;
pub use http_stub::HttpStub;
pub use test_context::{OptionAssertions, ResultAssertions, TestContext};

// Re-export types from the main crate for convenience
pub use backup_relay::config::{
    Config, DatabaseSourceConfig, DestinationConfig, HttpSourceConfig, RawFilesConfig,
    S3DestinationConfig, SourceConfig,
};
pub use backup_relay::destinations::Destination;
pub use backup_relay::sources::{Artifact, CaptureStatus, Source, SourceError};
pub use backup_relay::utils::archive::ArchiveKind;

// Re-export mock implementations from the main crate
pub use backup_relay::utils::credentials::mock::StaticResolver;
pub use backup_relay::utils::credentials::CredentialResolver;
pub use backup_relay::utils::executor::mock::{CommandCall, MockExecutor, MockResponse};
pub use backup_relay::utils::executor::CommandExecutor;
pub use backup_relay::utils::http::mock::{MockHttpClient, MockHttpResponse};
pub use backup_relay::utils::http::HttpClient;
pub use backup_relay::utils::storage_ops::mock::{MockObjectStore, StorageCall};
pub use backup_relay::utils::storage_ops::ObjectStore;

/// Common test result type
pub type TestResult<T = ()> = anyhow::Result<T>;
