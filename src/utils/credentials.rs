//! Credential lookup for sources and destinations
//!
//! Credentials left out of the configuration file are looked up by name under
//! `{PREFIX}_{NORMALIZED_NAME}_{FIELD}`, for example `PG_MAIN_DB_PASSWORD` for a
//! PostgreSQL source named `"main db"`. The lookup goes through a [`CredentialResolver`]
//! so tests never have to touch the process environment.

use crate::config::ConfigError;

/// Named secret lookup
pub trait CredentialResolver: Send + Sync {
    /// Return the value stored under `variable`, if any
    fn lookup(&self, variable: &str) -> Option<String>;
}

/// Resolver backed by the process environment
#[derive(Debug, Clone, Default)]
pub struct EnvResolver;

impl EnvResolver {
    pub fn new() -> Self {
        Self
    }
}

impl CredentialResolver for EnvResolver {
    fn lookup(&self, variable: &str) -> Option<String> {
        std::env::var(variable).ok().filter(|value| !value.is_empty())
    }
}

/// Upper-case the entity name and replace spaces with underscores
pub fn normalize_name(name: &str) -> String {
    name.to_uppercase().replace(' ', "_")
}

/// Variable name for a credential field, e.g. `MYSQL_MY_DB_USERNAME`
pub fn credential_variable(prefix: &str, name: &str, field: &str) -> String {
    format!("{}_{}_{}", prefix, normalize_name(name), field)
}

/// Keep an explicit, non-empty value; otherwise ask the resolver.
///
/// Fails with [`ConfigError::MissingCredential`] when neither has a value.
pub fn resolve_credential(
    explicit: Option<&str>,
    resolver: &dyn CredentialResolver,
    prefix: &str,
    name: &str,
    field: &str,
) -> Result<String, ConfigError> {
    if let Some(value) = explicit.filter(|v| !v.is_empty()) {
        return Ok(value.to_string());
    }

    let variable = credential_variable(prefix, name, field);
    resolver
        .lookup(&variable)
        .ok_or_else(|| ConfigError::MissingCredential {
            entity: name.to_string(),
            variable,
        })
}

/// In-memory resolver for tests
/// Available for use in external test crates
pub mod mock {
    use super::CredentialResolver;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Resolver answering from a fixed map and recording every lookup
    #[derive(Clone, Default)]
    pub struct StaticResolver {
        values: HashMap<String, String>,
        lookups: Arc<Mutex<Vec<String>>>,
    }

    impl StaticResolver {
        pub fn new() -> Self {
            Self::default()
        }

        /// Add a variable
        pub fn with(mut self, variable: &str, value: &str) -> Self {
            self.values.insert(variable.to_string(), value.to_string());
            self
        }

        /// Variables asked for, in order
        pub fn lookups(&self) -> Vec<String> {
            self.lookups.lock().unwrap().clone()
        }
    }

    impl CredentialResolver for StaticResolver {
        fn lookup(&self, variable: &str) -> Option<String> {
            self.lookups.lock().unwrap().push(variable.to_string());
            self.values.get(variable).cloned()
        }
    }
}
