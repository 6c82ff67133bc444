//! Interactive prompts.

use async_trait::async_trait;
use dialoguer::{Confirm, Password};

use crate::{PluginError, PluginResult};

/// A yes/no question gating a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// Stable identifier, e.g. `publish`.
    pub key: String,
    /// Question shown to the operator.
    pub message: String,
}

impl Prompt {
    /// Creates a prompt.
    #[must_use]
    pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Asks the operator for decisions and one-time input.
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Asks whether the gated step should run.
    async fn confirm(&self, prompt: &Prompt) -> PluginResult<bool>;

    /// Asks for a one-time password. An empty answer means "give up".
    async fn one_time_password(&self) -> PluginResult<String>;
}

/// Terminal prompts.
#[derive(Debug, Clone, Copy, Default)]
pub struct DialoguerPrompter;

fn prompt_error(err: impl std::error::Error + Send + Sync + 'static) -> PluginError {
    PluginError::Io(std::io::Error::other(err))
}

#[async_trait]
impl Prompter for DialoguerPrompter {
    async fn confirm(&self, prompt: &Prompt) -> PluginResult<bool> {
        let message = prompt.message.clone();
        tokio::task::spawn_blocking(move || {
            Confirm::new()
                .with_prompt(message)
                .default(true)
                .interact()
        })
        .await
        .map_err(prompt_error)?
        .map_err(prompt_error)
    }

    async fn one_time_password(&self) -> PluginResult<String> {
        tokio::task::spawn_blocking(|| {
            Password::new()
                .with_prompt("Please enter OTP")
                .allow_empty_password(true)
                .interact()
        })
        .await
        .map_err(prompt_error)?
        .map_err(prompt_error)
    }
}

#[cfg(any(test, feature = "testing"))]
pub use scripted::ScriptedPrompter;

#[cfg(any(test, feature = "testing"))]
mod scripted {
    use std::collections::{HashSet, VecDeque};
    use std::sync::{Mutex, PoisonError};

    use async_trait::async_trait;

    use super::{Prompt, Prompter};
    use crate::PluginResult;

    /// Answers prompts from a script: every question is confirmed unless
    /// declined, and one-time passwords are handed out in order.
    #[derive(Debug, Default)]
    pub struct ScriptedPrompter {
        declined: HashSet<String>,
        otps: Mutex<VecDeque<String>>,
        asked: Mutex<Vec<String>>,
    }

    impl ScriptedPrompter {
        /// Creates a prompter that confirms everything.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Declines the prompt with the given key.
        #[must_use]
        pub fn decline(mut self, key: impl Into<String>) -> Self {
            self.declined.insert(key.into());
            self
        }

        /// Queues one-time passwords; an exhausted queue answers empty.
        #[must_use]
        pub fn with_otps<I, S>(self, otps: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            self.otps
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend(otps.into_iter().map(Into::into));
            self
        }

        /// Returns the keys asked so far, plus `otp` for each password request.
        pub fn asked(&self) -> Vec<String> {
            self.asked
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        fn note(&self, key: &str) {
            self.asked
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(key.to_string());
        }
    }

    #[async_trait]
    impl Prompter for ScriptedPrompter {
        async fn confirm(&self, prompt: &Prompt) -> PluginResult<bool> {
            self.note(&prompt.key);
            Ok(!self.declined.contains(&prompt.key))
        }

        async fn one_time_password(&self) -> PluginResult<String> {
            self.note("otp");
            Ok(self
                .otps
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front()
                .unwrap_or_default())
        }
    }
}
