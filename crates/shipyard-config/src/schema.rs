//! Configuration schema.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, ConfigResult};

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Version configuration.
    #[serde(default)]
    pub version: VersionConfig,

    /// Retry policy for remote calls.
    #[serde(default)]
    pub retry: RetryConfig,

    /// npm registry target.
    #[serde(default)]
    pub npm: NpmConfig,

    /// GitHub release target.
    #[serde(default)]
    pub github: GithubConfig,

    /// Git target.
    #[serde(default)]
    pub git: GitConfig,
}

impl Config {
    /// Checks values that parse but make no sense.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.retry.factor == 0 {
            return Err(ConfigError::Invalid(
                "retry.factor must be at least 1".to_string(),
            ));
        }
        if let Some(repository) = &self.github.repository
            && repository.split('/').filter(|part| !part.is_empty()).count() < 2
        {
            return Err(ConfigError::Invalid(format!(
                "github.repository must be \"owner/repo\", got \"{repository}\""
            )));
        }
        if self.github.token_ref.is_empty() {
            return Err(ConfigError::Invalid(
                "github.token_ref must name an environment variable".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    10
}

/// Version configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionConfig {
    /// Tag prefix (e.g., "v").
    #[serde(default = "default_tag_prefix")]
    pub tag_prefix: String,
}

impl Default for VersionConfig {
    fn default() -> Self {
        Self {
            tag_prefix: default_tag_prefix(),
        }
    }
}

fn default_tag_prefix() -> String {
    "v".to_string()
}

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts for transient failures.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_min_timeout_ms")]
    pub min_timeout_ms: u64,

    /// Backoff multiplier.
    #[serde(default = "default_factor")]
    pub factor: u32,

    /// Backoff ceiling, in milliseconds.
    #[serde(default = "default_max_timeout_ms")]
    pub max_timeout_ms: u64,
}

impl RetryConfig {
    /// Returns the delay before the first retry.
    #[must_use]
    pub fn min_timeout(&self) -> Duration {
        Duration::from_millis(self.min_timeout_ms)
    }

    /// Returns the backoff ceiling.
    #[must_use]
    pub fn max_timeout(&self) -> Duration {
        Duration::from_millis(self.max_timeout_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            min_timeout_ms: default_min_timeout_ms(),
            factor: default_factor(),
            max_timeout_ms: default_max_timeout_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_min_timeout_ms() -> u64 {
    1000
}

fn default_factor() -> u32 {
    2
}

fn default_max_timeout_ms() -> u64 {
    30_000
}

/// npm target configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpmConfig {
    /// Enable the target when a manifest is present.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Path to the package manifest.
    #[serde(default = "default_manifest")]
    pub manifest: String,

    /// Publish to the registry.
    #[serde(default = "default_true")]
    pub publish: bool,

    /// Dist-tag for pre-releases.
    pub tag: Option<String>,

    /// Directory or tarball passed to `npm publish`.
    #[serde(default = "default_publish_path")]
    pub publish_path: String,

    /// Extra arguments for `npm publish`.
    #[serde(default)]
    pub publish_args: Vec<String>,

    /// Skip registry, authentication and collaborator checks.
    #[serde(default)]
    pub skip_checks: bool,

    /// Budget for the registry checks, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// One-time password for the first publish attempt.
    pub otp: Option<String>,
}

impl NpmConfig {
    /// Returns the registry check budget.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for NpmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            manifest: default_manifest(),
            publish: true,
            tag: None,
            publish_path: default_publish_path(),
            publish_args: Vec::new(),
            skip_checks: false,
            timeout_secs: default_timeout_secs(),
            otp: None,
        }
    }
}

fn default_manifest() -> String {
    "package.json".to_string()
}

fn default_publish_path() -> String {
    ".".to_string()
}

/// GitHub release target configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GithubConfig {
    /// Create a GitHub release.
    #[serde(default)]
    pub release: bool,

    /// Environment variable holding the API token.
    #[serde(default = "default_token_ref")]
    pub token_ref: String,

    /// Host, for GitHub Enterprise. Defaults to the remote's host.
    pub host: Option<String>,

    /// `owner/repo`. Defaults to the `origin` remote.
    pub repository: Option<String>,

    /// Release title; `{version}` is replaced.
    #[serde(default = "default_release_name")]
    pub release_name: String,

    /// Release notes. Defaults to the commit log since the latest tag.
    pub release_notes: Option<String>,

    /// Leave the release as a draft.
    #[serde(default)]
    pub draft: bool,

    /// Mark as pre-release. Defaults to whether the version is one.
    pub pre_release: Option<bool>,

    /// Glob patterns of files to upload.
    #[serde(default)]
    pub assets: Vec<String>,

    /// Skip authentication and collaborator checks.
    #[serde(default)]
    pub skip_checks: bool,

    /// Budget for the checks, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl GithubConfig {
    /// Returns the check budget.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            release: false,
            token_ref: default_token_ref(),
            host: None,
            repository: None,
            release_name: default_release_name(),
            release_notes: None,
            draft: false,
            pre_release: None,
            assets: Vec::new(),
            skip_checks: false,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_token_ref() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_release_name() -> String {
    "Release {version}".to_string()
}

/// Git target configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitConfig {
    /// Enable the target.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Refuse to release with uncommitted changes.
    #[serde(default = "default_true")]
    pub require_clean_working_dir: bool,

    /// Refuse to release without an upstream branch.
    #[serde(default = "default_true")]
    pub require_upstream: bool,

    /// Commit the version bump.
    #[serde(default = "default_true")]
    pub commit: bool,

    /// Commit message; `{version}` is replaced.
    #[serde(default = "default_release_message")]
    pub commit_message: String,

    /// Create a tag.
    #[serde(default = "default_true")]
    pub tag: bool,

    /// Tag annotation; `{version}` is replaced.
    #[serde(default = "default_release_message")]
    pub tag_annotation: String,

    /// Push the commit and tag.
    #[serde(default = "default_true")]
    pub push: bool,

    /// Remote to push to. Defaults to the upstream.
    pub push_remote: Option<String>,

    /// Budget for the checks, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl GitConfig {
    /// Returns the check budget.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            require_clean_working_dir: true,
            require_upstream: true,
            commit: true,
            commit_message: default_release_message(),
            tag: true,
            tag_annotation: default_release_message(),
            push: true,
            push_remote: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_release_message() -> String {
    "Release {version}".to_string()
}
