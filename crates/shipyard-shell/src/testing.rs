//! Deterministic command runner for tests.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::{CommandOutput, CommandRunner, ShellCommand, ShellResult};

struct Rule {
    prefix: String,
    output: CommandOutput,
    remaining: Option<usize>,
}

/// Answers commands from a script instead of spawning processes.
///
/// Rules match on a prefix of the rendered command line and are tried in
/// insertion order. Unmatched commands succeed with empty output.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    /// Creates a runner where every command succeeds silently.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers every command starting with `prefix`.
    #[must_use]
    pub fn on(self, prefix: impl Into<String>, output: CommandOutput) -> Self {
        self.push(prefix.into(), output, None)
    }

    /// Answers the next command starting with `prefix`, once.
    #[must_use]
    pub fn once(self, prefix: impl Into<String>, output: CommandOutput) -> Self {
        self.push(prefix.into(), output, Some(1))
    }

    fn push(self, prefix: String, output: CommandOutput, remaining: Option<usize>) -> Self {
        self.rules
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Rule {
                prefix,
                output,
                remaining,
            });
        self
    }

    /// Returns every command line run so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Counts runs of commands starting with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, command: &ShellCommand) -> ShellResult<CommandOutput> {
        let line = command.to_string();
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.clone());

        let mut rules = self.rules.lock().unwrap_or_else(PoisonError::into_inner);
        let rule = rules
            .iter_mut()
            .find(|rule| line.starts_with(&rule.prefix) && rule.remaining != Some(0));

        Ok(match rule {
            Some(rule) => {
                if let Some(remaining) = rule.remaining.as_mut() {
                    *remaining -= 1;
                }
                rule.output.clone()
            }
            None => CommandOutput::success(""),
        })
    }
}
