//! Dry-run aware command execution.

use std::sync::Arc;

use tracing::{debug, info};

use crate::{CommandRunner, ExecError, ExecLog, OperationKind, ShellCommand, ShellResult};

/// Per-invocation execution options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecOptions {
    /// The command changes state (files, registries, remotes).
    pub write: bool,
}

impl ExecOptions {
    /// Options for a read-only command; always executed.
    #[must_use]
    pub fn read() -> Self {
        Self { write: false }
    }

    /// Options for a mutating command; suppressed in dry-run mode.
    #[must_use]
    pub fn write() -> Self {
        Self { write: true }
    }
}

/// Runs external commands and records every invocation.
///
/// In dry-run mode, commands run with [`ExecOptions::write`] are logged but
/// not executed, and an empty string is returned in place of their output.
pub struct Shell {
    runner: Arc<dyn CommandRunner>,
    log: Arc<ExecLog>,
    dry_run: bool,
}

impl Shell {
    /// Creates a shell over the given runner.
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            log: Arc::new(ExecLog::new()),
            dry_run: false,
        }
    }

    /// Sets the dry run flag.
    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Records into a shared log instead of a private one.
    #[must_use]
    pub fn with_log(mut self, log: Arc<ExecLog>) -> Self {
        self.log = log;
        self
    }

    /// Returns whether mutating commands are suppressed.
    #[must_use]
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Returns the execution log.
    #[must_use]
    pub fn log(&self) -> &Arc<ExecLog> {
        &self.log
    }

    /// Runs a command and returns its trimmed standard output.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError::Spawn`] if the process cannot be started and
    /// [`ExecError::Failed`] if it exits with a non-zero status.
    pub async fn exec(&self, command: &ShellCommand, options: ExecOptions) -> ShellResult<String> {
        let line = command.to_string();

        if self.dry_run && options.write {
            self.log.record(&line, OperationKind::Command, false);
            info!(command = %line, "(dry-run) skipped");
            return Ok(String::new());
        }

        self.log.record(&line, OperationKind::Command, true);
        debug!(command = %line, "exec");

        let output = self.runner.run(command).await?;
        if output.is_success() {
            return Ok(output.stdout.trim().to_string());
        }

        debug!(command = %line, status = ?output.status, "command failed");
        Err(ExecError::Failed {
            command: line,
            status: output.status,
            output: output.combined(),
        })
    }

    /// Runs a read-only command.
    ///
    /// # Errors
    ///
    /// See [`Shell::exec`].
    pub async fn read(&self, command: &ShellCommand) -> ShellResult<String> {
        self.exec(command, ExecOptions::read()).await
    }

    /// Runs a mutating command.
    ///
    /// # Errors
    ///
    /// See [`Shell::exec`].
    pub async fn write(&self, command: &ShellCommand) -> ShellResult<String> {
        self.exec(command, ExecOptions::write()).await
    }
}

impl std::fmt::Debug for Shell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shell")
            .field("dry_run", &self.dry_run)
            .field("log_len", &self.log.len())
            .finish_non_exhaustive()
    }
}
