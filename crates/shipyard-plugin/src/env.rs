//! Process environment access.

use std::collections::HashMap;

const CI_MARKERS: &[&str] = &[
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "BUILDKITE",
    "CIRCLECI",
    "TRAVIS",
    "JENKINS_URL",
];

/// Read access to environment variables.
///
/// Plugins receive this at construction instead of reading process state
/// directly.
pub trait Environment: Send + Sync {
    /// Returns the value of a variable, if set.
    fn var(&self, name: &str) -> Option<String>;

    /// Returns the value of a variable if it is set and non-empty.
    fn non_empty(&self, name: &str) -> Option<String> {
        self.var(name).filter(|value| !value.is_empty())
    }

    /// Returns `true` when running under a recognized CI provider.
    fn is_ci(&self) -> bool {
        if let Some(ci) = self.var("CI") {
            return !matches!(ci.as_str(), "" | "false" | "0");
        }
        CI_MARKERS.iter().any(|marker| self.non_empty(marker).is_some())
    }

    /// Returns the identity supplied by a trusted CI provider.
    fn trusted_actor(&self) -> Option<String> {
        if self.var("GITHUB_ACTIONS").as_deref() == Some("true") {
            return self.non_empty("GITHUB_ACTOR");
        }
        None
    }
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// A fixed set of variables.
#[derive(Debug, Clone, Default)]
pub struct StaticEnvironment {
    vars: HashMap<String, String>,
}

impl StaticEnvironment {
    /// Creates an empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a variable.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }
}

impl Environment for StaticEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StaticEnvironment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
