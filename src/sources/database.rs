//! MySQL and PostgreSQL dumps through the vendor dump tools
//!
//! Passwords never appear on the command line. MySQL reads them from an
//! option file passed with `--defaults-extra-file`, PostgreSQL from a pgpass
//! file named by `PGPASSFILE`. Both files live in the system temp dir, are
//! owner-only, and are removed as soon as the dump tool returns.

use super::{create_artifact_file, Artifact, Source, SourceError};
use crate::config::{ConfigError, DatabaseSourceConfig};
use crate::utils::credentials::{resolve_credential, CredentialResolver};
use crate::utils::executor::{CommandExecutor, CommandSpec};
use crate::utils::timestamp::{artifact_file_name, now_iso};
use anyhow::Context;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseEngine {
    Mysql,
    Postgres,
}

impl DatabaseEngine {
    /// Prefix of credential variables, e.g. `PG_MAIN_PASSWORD`
    pub fn credential_prefix(&self) -> &'static str {
        match self {
            DatabaseEngine::Mysql => "MYSQL",
            DatabaseEngine::Postgres => "PG",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            DatabaseEngine::Mysql => 3306,
            DatabaseEngine::Postgres => 5432,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DatabaseEngine::Mysql => "mysql",
            DatabaseEngine::Postgres => "postgres",
        }
    }
}

/// What to dump
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseSelection {
    Single(String),
    All,
}

pub struct DatabaseSource {
    engine: DatabaseEngine,
    name: String,
    backup_filename: String,
    host: String,
    port: u16,
    username: String,
    password: String,
    selection: DatabaseSelection,
    program: String,
    executor: Arc<dyn CommandExecutor>,
}

impl fmt::Debug for DatabaseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSource")
            .field("engine", &self.engine)
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("selection", &self.selection)
            .field("program", &self.program)
            .finish()
    }
}

impl DatabaseSource {
    /// Validate the selector and resolve missing credentials.
    ///
    /// Fails when neither `database` nor `all_databases` is set, or when a
    /// credential is neither configured nor available from the resolver.
    pub fn from_config(
        engine: DatabaseEngine,
        config: &DatabaseSourceConfig,
        resolver: &dyn CredentialResolver,
        executor: Arc<dyn CommandExecutor>,
    ) -> Result<Self, ConfigError> {
        let name = config.display_name().to_string();

        let selection = match config.database.as_deref() {
            _ if config.all_databases => DatabaseSelection::All,
            Some(database) if !database.is_empty() => {
                DatabaseSelection::Single(database.to_string())
            }
            _ => return Err(ConfigError::MissingDatabaseSelector(name)),
        };

        let prefix = engine.credential_prefix();
        let username =
            resolve_credential(config.username.as_deref(), resolver, prefix, &name, "USERNAME")?;
        let password =
            resolve_credential(config.password.as_deref(), resolver, prefix, &name, "PASSWORD")?;

        let program = match (engine, &selection) {
            (DatabaseEngine::Mysql, _) => config.mysql_dump_bin.as_deref().unwrap_or("mysqldump"),
            (DatabaseEngine::Postgres, DatabaseSelection::Single(_)) => {
                config.pg_dump_bin.as_deref().unwrap_or("pg_dump")
            }
            (DatabaseEngine::Postgres, DatabaseSelection::All) => {
                config.pg_dumpall_bin.as_deref().unwrap_or("pg_dumpall")
            }
        }
        .to_string();

        Ok(Self {
            engine,
            name,
            backup_filename: config.backup_filename.clone(),
            host: config.host.clone(),
            port: config.port.unwrap_or_else(|| engine.default_port()),
            username,
            password,
            selection,
            program,
            executor,
        })
    }

    pub fn engine(&self) -> DatabaseEngine {
        self.engine
    }

    pub fn selection(&self) -> &DatabaseSelection {
        &self.selection
    }

    /// Contents of the ephemeral credentials file
    fn credentials_contents(&self) -> String {
        match self.engine {
            DatabaseEngine::Mysql => format!(
                "[client]\npassword=\"{}\"\n",
                escape_option_value(&self.password)
            ),
            DatabaseEngine::Postgres => {
                let database = match &self.selection {
                    DatabaseSelection::Single(database) => escape_pgpass_field(database),
                    DatabaseSelection::All => "*".to_string(),
                };
                format!(
                    "{}:{}:{}:{}:{}\n",
                    escape_pgpass_field(&self.host),
                    self.port,
                    database,
                    escape_pgpass_field(&self.username),
                    escape_pgpass_field(&self.password)
                )
            }
        }
    }

    fn write_credentials_file(&self) -> anyhow::Result<NamedTempFile> {
        let mut file = tempfile::Builder::new()
            .prefix("backup-relay-")
            .tempfile()
            .context("Failed to create credentials file")?;
        file.write_all(self.credentials_contents().as_bytes())
            .context("Failed to write credentials file")?;
        file.flush().context("Failed to write credentials file")?;
        Ok(file)
    }

    /// Dump tool invocation using the credentials file at `credentials`
    pub fn command(&self, credentials: &Path) -> CommandSpec {
        let credentials = credentials.display().to_string();
        match self.engine {
            DatabaseEngine::Mysql => {
                let command = CommandSpec::new(&self.program)
                    .arg(format!("--defaults-extra-file={}", credentials))
                    .arg(format!("--host={}", self.host))
                    .arg(format!("--port={}", self.port))
                    .arg(format!("--user={}", self.username));
                match &self.selection {
                    DatabaseSelection::Single(database) => command.arg(database),
                    DatabaseSelection::All => command.arg("--all-databases"),
                }
            }
            DatabaseEngine::Postgres => {
                let command = CommandSpec::new(&self.program)
                    .arg(format!("--host={}", self.host))
                    .arg(format!("--port={}", self.port))
                    .arg(format!("--username={}", self.username))
                    .env("PGPASSFILE", credentials);
                match &self.selection {
                    DatabaseSelection::Single(database) => command.arg(database),
                    DatabaseSelection::All => command,
                }
            }
        }
    }
}

impl Source for DatabaseSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        self.engine.label()
    }

    fn backup(&self, workspace: &Path) -> Result<Artifact, SourceError> {
        let path = workspace.join(artifact_file_name(&self.backup_filename, &now_iso(), "sql"));
        create_artifact_file(&path)?;

        let credentials = match self.write_credentials_file() {
            Ok(file) => file,
            Err(e) => {
                error!("{} dump of '{}' failed: {:#}", self.engine.label(), self.name, e);
                return Ok(Artifact::degraded(&self.name, path, format!("{:#}", e)));
            }
        };

        let command = self.command(credentials.path());
        info!("Dumping {} source '{}' with {}", self.engine.label(), self.name, self.program);
        let result = self.executor.run_to_file(&command, &path);

        if let Err(e) = credentials.close() {
            warn!("Failed to remove credentials file: {}", e);
        }

        let artifact = match result {
            Ok(outcome) if outcome.success() => {
                debug!("Dump written to {:?}", path);
                info!("✓ {} dump of '{}' complete", self.engine.label(), self.name);
                Artifact::complete(&self.name, path)
            }
            Ok(outcome) => {
                let code = outcome
                    .code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string());
                error!(
                    "{} dump of '{}' failed with exit code {}: {}",
                    self.engine.label(),
                    self.name,
                    code,
                    outcome.stderr.trim()
                );
                Artifact::degraded(&self.name, path, format!("exit code {}", code))
            }
            Err(e) => {
                error!("{} dump of '{}' failed: {:#}", self.engine.label(), self.name, e);
                Artifact::degraded(&self.name, path, format!("{:#}", e))
            }
        };

        Ok(artifact)
    }
}

/// Backslash-escape `\` and `:` for a pgpass field
fn escape_pgpass_field(value: &str) -> String {
    value.replace('\\', "\\\\").replace(':', "\\:")
}

/// Escape a double-quoted MySQL option file value
fn escape_option_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
