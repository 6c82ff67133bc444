//! Progress display for non-interactive runs.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// A spinner shown while a step runs.
pub(crate) struct Spinner {
    bar: ProgressBar,
    label: String,
}

impl Spinner {
    /// Starts a spinner; a hidden bar is used when `visible` is false.
    pub(crate) fn start(label: &str, visible: bool) -> Self {
        let bar = if visible {
            let bar = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
                bar.set_style(style);
            }
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        } else {
            ProgressBar::hidden()
        };
        bar.set_message(label.to_string());
        Self {
            bar,
            label: label.to_string(),
        }
    }

    pub(crate) fn succeed(self) {
        self.bar.finish_with_message(format!("✔ {}", self.label));
    }

    pub(crate) fn fail(self) {
        self.bar.abandon_with_message(format!("✖ {}", self.label));
    }
}
