//! Process spawning.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;

use crate::{ExecError, ShellCommand, ShellResult};

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit status, `None` if the process was killed by a signal.
    pub status: Option<i32>,
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Creates a successful output with the given stdout.
    #[must_use]
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Creates a failed output with the given status and stderr.
    #[must_use]
    pub fn failure(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Returns `true` if the process exited with status zero.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == Some(0)
    }

    /// Returns stderr and stdout joined, trimmed.
    #[must_use]
    pub fn combined(&self) -> String {
        let parts: Vec<&str> = [self.stderr.trim(), self.stdout.trim()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect();
        parts.join("\n")
    }
}

/// Runs a command to completion.
///
/// Implementations only report spawn failures as errors; a non-zero exit
/// status is returned in [`CommandOutput`] and interpreted by [`Shell`](crate::Shell).
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs the command and captures its output.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be started.
    async fn run(&self, command: &ShellCommand) -> ShellResult<CommandOutput>;
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    cwd: Option<PathBuf>,
}

impl SystemRunner {
    /// Creates a runner using the current working directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs commands in the given directory.
    #[must_use]
    pub fn in_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, command: &ShellCommand) -> ShellResult<CommandOutput> {
        let mut process = Command::new(command.program());
        process.args(command.arguments()).kill_on_drop(true);
        if let Some(cwd) = &self.cwd {
            process.current_dir(cwd);
        }

        let output = process.output().await.map_err(|source| ExecError::Spawn {
            command: command.to_string(),
            source,
        })?;

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_output() {
        let output = CommandOutput::success("ok\n");
        assert!(output.is_success());
        assert_eq!(output.combined(), "ok");
    }

    #[test]
    fn test_failure_output() {
        let output = CommandOutput::failure(1, "boom");
        assert!(!output.is_success());
        assert_eq!(output.combined(), "boom");
    }

    #[test]
    fn test_combined_joins_streams() {
        let output = CommandOutput {
            status: Some(1),
            stdout: "out\n".to_string(),
            stderr: "err\n".to_string(),
        };
        assert_eq!(output.combined(), "err\nout");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_captures_stdout() {
        let runner = SystemRunner::new();
        let output = runner
            .run(&ShellCommand::new("echo").arg("hello"))
            .await
            .unwrap();
        assert!(output.is_success());
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_system_runner_spawn_error() {
        let runner = SystemRunner::new();
        let result = runner
            .run(&ShellCommand::new("shipyard-definitely-missing-binary"))
            .await;
        assert!(matches!(result, Err(ExecError::Spawn { .. })));
    }
}
