//! Utilities for running commands with their output redirected into files

use super::executor::{CommandSpec, ExitOutcome};
use anyhow::{Context, Result};
use std::fs::File;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

/// Run a command, streaming its stdout into `stdout_path`.
///
/// Stderr is captured and returned; a non-zero exit is not an error here and
/// is left to the caller to report.
pub fn run_to_file(command: &CommandSpec, stdout_path: &Path) -> Result<ExitOutcome> {
    let stdout = File::create(stdout_path)
        .with_context(|| format!("Failed to open output file: {:?}", stdout_path))?;

    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args);
    for (key, value) in &command.envs {
        cmd.env(key, value);
    }
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::from(stdout));
    cmd.stderr(Stdio::piped());

    debug!("Running command: {}", command);

    let output = cmd
        .output()
        .context(format!("Failed to execute {}", command.program))?;

    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    if !output.status.success() {
        debug!("Command exited with {:?}: {}", output.status.code(), command);
        if !stderr.is_empty() {
            debug!("Stderr: {}", stderr.trim());
        }
    }

    Ok(ExitOutcome {
        code: output.status.code(),
        stderr,
    })
}
