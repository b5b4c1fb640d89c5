//! Command execution abstraction for testability
//!
//! Dump tools are run through [`CommandExecutor`] so sources can be exercised
//! against a mock that records invocations instead of spawning processes.

use anyhow::Result;
use std::fmt;
use std::path::Path;

/// A program invocation: executable, arguments and extra environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// How a finished process exited
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExitOutcome {
    /// Exit code, `None` when killed by a signal
    pub code: Option<i32>,
    pub stderr: String,
}

impl ExitOutcome {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Abstraction for command execution, enabling mocking in tests
pub trait CommandExecutor: Send + Sync {
    /// Run `command` with its standard output written to `stdout_path`.
    ///
    /// `stdout_path` is created or truncated. An `Err` means the process could
    /// not be run at all; a non-zero exit is reported through [`ExitOutcome`].
    fn run_to_file(&self, command: &CommandSpec, stdout_path: &Path) -> Result<ExitOutcome>;
}

/// Default implementation using real subprocess calls
#[derive(Debug, Clone, Default)]
pub struct RealExecutor;

impl RealExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl CommandExecutor for RealExecutor {
    fn run_to_file(&self, command: &CommandSpec, stdout_path: &Path) -> Result<ExitOutcome> {
        super::command::run_to_file(command, stdout_path)
    }
}

/// A mock executor for testing that records calls and returns configured responses
/// Available for use in external test crates
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use std::sync::{Arc, Mutex};

    /// Recorded command invocation
    #[derive(Clone, Debug)]
    pub struct CommandCall {
        pub program: String,
        pub args: Vec<String>,
        pub envs: Vec<(String, String)>,
        pub stdout_path: String,
        /// Contents of files referenced by env values or `--flag=path` args,
        /// read while the command "runs"
        pub referenced_files: HashMap<String, String>,
    }

    impl CommandCall {
        /// Value of an environment variable passed to the command
        pub fn env(&self, key: &str) -> Option<&str> {
            self.envs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        }
    }

    /// Response configuration for mock
    #[derive(Clone, Debug)]
    pub enum MockResponse {
        Success { stdout: String },
        Failure { stderr: String, exit_code: i32 },
        SpawnError,
    }

    impl Default for MockResponse {
        fn default() -> Self {
            MockResponse::Success {
                stdout: String::new(),
            }
        }
    }

    /// Mock executor for testing
    #[derive(Clone, Default)]
    pub struct MockExecutor {
        /// Recorded command invocations
        pub calls: Arc<Mutex<Vec<CommandCall>>>,
        /// Pre-configured responses: program name -> response
        responses: Arc<Mutex<HashMap<String, MockResponse>>>,
        /// Default response when no specific response is configured
        default_response: Arc<Mutex<MockResponse>>,
    }

    impl MockExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        /// Configure a response for a specific program
        pub fn expect(self, program: &str, response: MockResponse) -> Self {
            self.responses
                .lock()
                .unwrap()
                .insert(program.to_string(), response);
            self
        }

        /// Set the default response for unconfigured programs
        pub fn with_default_response(self, response: MockResponse) -> Self {
            *self.default_response.lock().unwrap() = response;
            self
        }

        /// Get all recorded calls
        pub fn get_calls(&self) -> Vec<CommandCall> {
            self.calls.lock().unwrap().clone()
        }

        /// Get number of calls to a specific program
        pub fn call_count(&self, program: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.program == program)
                .count()
        }

        fn record_call(&self, command: &CommandSpec, stdout_path: &Path) {
            let candidates = command
                .envs
                .iter()
                .map(|(_, v)| v.as_str())
                .chain(
                    command
                        .args
                        .iter()
                        .filter_map(|a| a.split_once('=').map(|(_, v)| v)),
                );

            let referenced_files = candidates
                .filter(|candidate| Path::new(candidate).is_file())
                .filter_map(|candidate| {
                    fs::read_to_string(candidate)
                        .ok()
                        .map(|contents| (candidate.to_string(), contents))
                })
                .collect();

            self.calls.lock().unwrap().push(CommandCall {
                program: command.program.clone(),
                args: command.args.clone(),
                envs: command.envs.clone(),
                stdout_path: stdout_path.display().to_string(),
                referenced_files,
            });
        }

        fn get_response(&self, program: &str) -> MockResponse {
            self.responses
                .lock()
                .unwrap()
                .get(program)
                .cloned()
                .unwrap_or_else(|| self.default_response.lock().unwrap().clone())
        }
    }

    impl CommandExecutor for MockExecutor {
        fn run_to_file(&self, command: &CommandSpec, stdout_path: &Path) -> Result<ExitOutcome> {
            self.record_call(command, stdout_path);
            match self.get_response(&command.program) {
                MockResponse::Success { stdout } => {
                    fs::write(stdout_path, stdout)?;
                    Ok(ExitOutcome {
                        code: Some(0),
                        stderr: String::new(),
                    })
                }
                MockResponse::Failure { stderr, exit_code } => {
                    fs::write(stdout_path, "")?;
                    Ok(ExitOutcome {
                        code: Some(exit_code),
                        stderr,
                    })
                }
                MockResponse::SpawnError => {
                    anyhow::bail!("Failed to execute {}: program not found", command.program)
                }
            }
        }
    }
}
