//! Step execution: prompts, progress display, dry-run simulation.

mod otp;
mod prompt;
mod spinner;

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use shipyard_shell::{ExecLog, OperationKind};
use tracing::info;

pub use otp::OtpState;
#[cfg(any(test, feature = "testing"))]
pub use prompt::ScriptedPrompter;
pub use prompt::{DialoguerPrompter, Prompt, Prompter};

use crate::PluginResult;
use spinner::Spinner;

/// How the current run behaves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunMode {
    /// Suppress side effects.
    pub dry_run: bool,
    /// Running under CI: no prompts.
    pub ci: bool,
}

impl RunMode {
    /// Returns `true` when the operator can be prompted.
    #[must_use]
    pub fn is_interactive(&self) -> bool {
        !self.ci
    }
}

/// Description of one unit of work.
#[derive(Debug, Clone)]
pub struct Step {
    label: String,
    prompt: Option<Prompt>,
    side_effects: bool,
    enabled: bool,
    otp: Option<String>,
}

impl Step {
    /// Creates an enabled step without prompt or side effects.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            prompt: None,
            side_effects: false,
            enabled: true,
            otp: None,
        }
    }

    /// Gates the step behind a confirmation in interactive runs.
    #[must_use]
    pub fn prompt(mut self, key: impl Into<String>, message: impl Into<String>) -> Self {
        self.prompt = Some(Prompt::new(key, message));
        self
    }

    /// Marks the task as mutating; it is simulated in dry-run.
    #[must_use]
    pub fn side_effects(mut self, side_effects: bool) -> Self {
        self.side_effects = side_effects;
        self
    }

    /// Enables or disables the step.
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Passes a one-time password to the first submission.
    #[must_use]
    pub fn otp(mut self, otp: Option<String>) -> Self {
        self.otp = otp;
        self
    }

    /// Returns the label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// What happened to a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome<T> {
    /// The task ran and returned a value.
    Completed(T),
    /// Disabled, or declined at the prompt.
    Skipped,
    /// Not run because of dry-run.
    Simulated,
}

impl<T> StepOutcome<T> {
    /// Returns the task's value, if it ran.
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Skipped | Self::Simulated => None,
        }
    }

    /// Returns `true` unless the step was skipped.
    pub fn is_done(&self) -> bool {
        !matches!(self, Self::Skipped)
    }
}

/// Final status of a step, kept for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Completed,
    Skipped,
    Simulated,
    Failed,
}

/// A finished step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub label: String,
    pub status: StepStatus,
}

/// Runs steps one at a time.
pub struct StepRunner {
    mode: RunMode,
    prompter: Arc<dyn Prompter>,
    log: Arc<ExecLog>,
    records: Mutex<Vec<StepRecord>>,
}

impl StepRunner {
    /// Creates a runner writing simulated tasks to `log`.
    #[must_use]
    pub fn new(mode: RunMode, prompter: Arc<dyn Prompter>, log: Arc<ExecLog>) -> Self {
        Self {
            mode,
            prompter,
            log,
            records: Mutex::new(Vec::new()),
        }
    }

    /// Returns the run mode.
    #[must_use]
    pub fn mode(&self) -> RunMode {
        self.mode
    }

    /// Returns the steps run so far.
    pub fn records(&self) -> Vec<StepRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Runs a step.
    ///
    /// The task receives a one-time password when one has been supplied.
    /// If it fails for lack of one in an interactive run, the operator is
    /// asked for a code and the task is run again with it.
    ///
    /// # Errors
    ///
    /// Returns the task's error, or [`crate::PluginError::Aborted`] if the
    /// operator gives up on the one-time password.
    pub async fn run<T, F, Fut>(&self, step: Step, mut task: F) -> PluginResult<StepOutcome<T>>
    where
        F: FnMut(Option<String>) -> Fut,
        Fut: Future<Output = PluginResult<T>>,
    {
        if !step.enabled {
            return Ok(self.finish(&step, StepOutcome::Skipped));
        }

        if self.mode.is_interactive()
            && let Some(prompt) = &step.prompt
            && !self.prompter.confirm(prompt).await?
        {
            info!(step = %step.label, "skipped");
            return Ok(self.finish(&step, StepOutcome::Skipped));
        }

        if step.side_effects {
            if self.mode.dry_run {
                self.log.record(&step.label, OperationKind::Task, false);
                info!(step = %step.label, "(dry-run) simulated");
                return Ok(self.finish(&step, StepOutcome::Simulated));
            }
            self.log.record(&step.label, OperationKind::Task, true);
        }

        let spinner = Spinner::start(&step.label, !self.mode.is_interactive());
        let interactive = self.mode.is_interactive();
        match otp::submit(self.prompter.as_ref(), interactive, step.otp.clone(), &mut task).await {
            Ok(value) => {
                spinner.succeed();
                Ok(self.finish(&step, StepOutcome::Completed(value)))
            }
            Err(err) => {
                spinner.fail();
                self.push(&step.label, StepStatus::Failed);
                Err(err)
            }
        }
    }

    fn finish<T>(&self, step: &Step, outcome: StepOutcome<T>) -> StepOutcome<T> {
        let status = match &outcome {
            StepOutcome::Completed(_) => StepStatus::Completed,
            StepOutcome::Skipped => StepStatus::Skipped,
            StepOutcome::Simulated => StepStatus::Simulated,
        };
        self.push(&step.label, status);
        outcome
    }

    fn push(&self, label: &str, status: StepStatus) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(StepRecord {
                label: label.to_string(),
                status,
            });
    }
}

impl std::fmt::Debug for StepRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepRunner")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}
