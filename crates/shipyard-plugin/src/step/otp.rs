//! One-time password re-entry.

use std::future::Future;

use tracing::{debug, warn};

use super::Prompter;
use crate::{PluginError, PluginResult};

/// States of a task that may need a one-time password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtpState {
    /// The task is being run, with the code to pass, if any.
    Submitting(Option<String>),
    /// The submitted code was refused.
    Rejected,
    /// Waiting for the operator to enter a code.
    AwaitingInput,
    /// The task succeeded.
    Accepted,
}

impl OtpState {
    /// Transition after a submission was refused for lack of a valid code.
    #[must_use]
    pub fn refused(&self) -> Self {
        match self {
            Self::Submitting(Some(_)) => Self::Rejected,
            _ => Self::AwaitingInput,
        }
    }

    /// Transition after the operator answered the OTP prompt.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Aborted`] for an empty answer.
    pub fn entered(code: &str) -> PluginResult<Self> {
        let code = code.trim();
        if code.is_empty() {
            return Err(PluginError::Aborted(
                "no one-time password provided".to_string(),
            ));
        }
        Ok(Self::Submitting(Some(code.to_string())))
    }
}

/// Runs `task` until it succeeds, asking for a new code each time it is
/// refused for lack of one. Only interactive runs ask; otherwise the first
/// failure is returned.
pub(crate) async fn submit<T, F, Fut>(
    prompter: &dyn Prompter,
    interactive: bool,
    initial: Option<String>,
    task: &mut F,
) -> PluginResult<T>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = PluginResult<T>>,
{
    let mut state = OtpState::Submitting(initial);
    let mut output = None;
    loop {
        state = match state {
            OtpState::Submitting(otp) => match task(otp.clone()).await {
                Ok(value) => {
                    output = Some(value);
                    OtpState::Accepted
                }
                Err(err) if interactive && err.requires_otp() => {
                    debug!("one-time password required");
                    OtpState::Submitting(otp).refused()
                }
                Err(err) => return Err(err),
            },
            OtpState::Rejected => {
                warn!("The provided OTP is incorrect or has expired.");
                OtpState::AwaitingInput
            }
            OtpState::AwaitingInput => {
                let code = prompter.one_time_password().await?;
                OtpState::entered(&code)?
            }
            OtpState::Accepted => break,
        };
    }
    output.ok_or_else(|| PluginError::Aborted("task produced no result".to_string()))
}
