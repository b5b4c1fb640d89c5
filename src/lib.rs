//! Backup Relay Library
//!
//! Collects artifacts from databases, files and HTTP endpoints into a private
//! workspace, packs them into one combined archive, and distributes the result
//! to object storage.

pub mod config;
pub mod destinations;
pub mod managers;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use config::{load_config, Config};
pub use destinations::{BackupDestination, Destination};
pub use managers::backup::BackupManager;
pub use managers::logging::{init_console_logging, init_logging, LogGuard, LoggingConfig};
pub use managers::report::{RunError, RunPhase, RunReport};
pub use sources::{Artifact, BackupSource, CaptureStatus, Source, SourceError};
