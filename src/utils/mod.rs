pub mod archive;
pub mod command;
pub mod credentials;
pub mod timestamp;

// Trait-based abstractions for testability
pub mod executor;
pub mod http;
pub mod storage_ops;

// Re-export commonly used types and traits (used by test crate)
pub use credentials::{CredentialResolver, EnvResolver};
pub use executor::{CommandExecutor, RealExecutor};
pub use http::{HttpClient, ReqwestClient};
pub use storage_ops::{ObjectStore, S3ObjectStore};
