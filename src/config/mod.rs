//! Configuration module for backup-relay
//!
//! This module handles loading and validating configuration from TOML or JSON
//! files, and building the configured sources and destinations from it.
//!
//! ## Example Usage
//!
//! ```no_run
//! use backup_relay::config;
//! use backup_relay::utils::credentials::EnvResolver;
//!
//! let config = config::load_config("config.toml")?;
//! let destinations = config::build_destinations(&config, &EnvResolver::new())?;
//!
//! for source in &config.sources {
//!     println!("Source: {} ({})", source.name(), source.kind());
//! }
//! # Ok::<(), config::ConfigError>(())
//! ```

mod loader;
mod types;

pub use loader::{
    build_destinations, build_destinations_with, build_sources, load_config, parse_config,
    ConfigError, ConfigFormat, Result,
};
pub use types::*;

/// Expand tilde (~) in path
pub fn expand_tilde(path: &std::path::Path) -> std::path::PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}
