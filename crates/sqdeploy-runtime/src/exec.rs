//! External command execution.

use std::path::Path;
use std::process::Command;

use sqdeploy_common::error::{DeployError, Result};

/// Output from a command run on the host or inside the container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    /// Standard output from the command.
    pub stdout: String,
    /// Standard error from the command.
    pub stderr: String,
    /// Exit code returned by the command.
    pub exit_code: i32,
}

impl ExecOutput {
    /// Creates a successful output with the given stdout.
    #[must_use]
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            ..Self::default()
        }
    }

    /// Creates a failed output with the given exit code and stderr.
    #[must_use]
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stderr: stderr.into(),
            exit_code,
            ..Self::default()
        }
    }

    /// Returns whether the command exited with status zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns the most useful diagnostic text: stderr, else stdout, else
    /// the exit code.
    #[must_use]
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        format!("exit status {}", self.exit_code)
    }
}

/// Runs `program` with `args` to completion, capturing its output.
///
/// A non-zero exit is not an error here; callers inspect
/// [`ExecOutput::success`].
///
/// # Errors
///
/// Returns an error if the program cannot be spawned.
pub fn run_command(program: &Path, args: &[String], cwd: Option<&Path>) -> Result<ExecOutput> {
    tracing::debug!(program = %program.display(), ?args, "running command");

    let mut cmd = Command::new(program);
    let _ = cmd.args(args);
    if let Some(dir) = cwd {
        let _ = cmd.current_dir(dir);
    }
    let output = cmd.output().map_err(|e| DeployError::Io {
        path: program.to_path_buf(),
        source: e,
    })?;

    let result = ExecOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(-1),
    };
    tracing::debug!(exit_code = result.exit_code, "command finished");
    Ok(result)
}
