//! Upload targets
//!
//! A grouped destination is handed the combined archive only; an ungrouped one
//! is handed every per-source artifact.

mod object_storage;

pub use object_storage::ObjectStorageDestination;

use anyhow::Result;
use std::path::PathBuf;

pub trait Destination {
    fn name(&self) -> &str;

    fn kind(&self) -> &'static str;

    /// Receives the combined archive instead of per-source artifacts
    fn is_grouped(&self) -> bool;

    /// Upload `artifacts` in order. Stops at the first failure.
    fn upload(&self, artifacts: &[PathBuf]) -> Result<()>;
}

/// Closed set of configured destinations
pub enum BackupDestination {
    ObjectStorage(ObjectStorageDestination),
}

impl BackupDestination {
    fn inner(&self) -> &dyn Destination {
        match self {
            BackupDestination::ObjectStorage(d) => d,
        }
    }
}

impl Destination for BackupDestination {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn kind(&self) -> &'static str {
        self.inner().kind()
    }

    fn is_grouped(&self) -> bool {
        self.inner().is_grouped()
    }

    fn upload(&self, artifacts: &[PathBuf]) -> Result<()> {
        self.inner().upload(artifacts)
    }
}
