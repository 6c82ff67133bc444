//! Collaborators handed to every plugin.

use std::sync::Arc;

use shipyard_shell::{CommandRunner, ExecLog, Shell};

use crate::{Environment, Prompter, RetryPolicy, RunMode, StepRunner};

/// Shared services for one release run.
///
/// The shell and the step runner write to the same [`ExecLog`], so the log
/// holds commands and side-effecting tasks in call order.
#[derive(Clone)]
pub struct PluginServices {
    /// Command execution.
    pub shell: Arc<Shell>,
    /// Step execution.
    pub steps: Arc<StepRunner>,
    /// Environment variables.
    pub env: Arc<dyn Environment>,
    /// Retry policy for remote calls.
    pub retry: RetryPolicy,
    /// Run mode.
    pub mode: RunMode,
}

impl PluginServices {
    /// Wires services for a run.
    #[must_use]
    pub fn new(
        mode: RunMode,
        runner: Arc<dyn CommandRunner>,
        prompter: Arc<dyn Prompter>,
        env: Arc<dyn Environment>,
    ) -> Self {
        let log = Arc::new(ExecLog::new());
        let shell = Shell::new(runner).dry_run(mode.dry_run).with_log(log.clone());
        Self {
            shell: Arc::new(shell),
            steps: Arc::new(StepRunner::new(mode, prompter, log)),
            env,
            retry: RetryPolicy::default(),
            mode,
        }
    }

    /// Replaces the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the shared execution log.
    #[must_use]
    pub fn log(&self) -> &Arc<ExecLog> {
        self.shell.log()
    }
}

impl std::fmt::Debug for PluginServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginServices")
            .field("mode", &self.mode)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
