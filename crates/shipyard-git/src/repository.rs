//! Git repository wrapper.

use std::sync::Arc;

use semver::Version;
use shipyard_shell::{ExecError, Shell, ShellCommand};
use tracing::debug;

use crate::{GitError, GitResult};

fn git() -> ShellCommand {
    ShellCommand::new("git")
}

/// Returns the version a tag names, once `prefix` is stripped.
///
/// Tags without the prefix, or whose remainder is not semver, name no version.
#[must_use]
pub fn version_from_tag(tag: &str, prefix: &str) -> Option<Version> {
    let version_str = tag.strip_prefix(prefix)?;
    Version::parse(version_str).ok()
}

/// A Git repository, operated through the shell.
///
/// Reads always run; writes are suppressed when the shell is in dry-run mode.
#[derive(Debug, Clone)]
pub struct Repository {
    shell: Arc<Shell>,
}

impl Repository {
    /// Creates a repository handle over the given shell.
    #[must_use]
    pub fn new(shell: Arc<Shell>) -> Self {
        Self { shell }
    }

    /// Returns `true` if the working directory is inside a repository.
    ///
    /// # Errors
    ///
    /// Returns an error if git cannot be started.
    pub async fn is_repository(&self) -> GitResult<bool> {
        let cmd = git().args(["rev-parse", "--git-dir"]);
        optional(self.shell.read(&cmd).await).map(|dir| dir.is_some())
    }

    /// Returns the most recent tag reachable from `HEAD`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if git cannot be started.
    pub async fn latest_tag(&self) -> GitResult<Option<String>> {
        let cmd = git().args(["describe", "--tags", "--abbrev=0"]);
        optional(self.shell.read(&cmd).await)
    }

    /// Returns the URL of the given remote, if configured.
    ///
    /// # Errors
    ///
    /// Returns an error if git cannot be started.
    pub async fn remote_url(&self, remote: &str) -> GitResult<Option<String>> {
        let key = format!("remote.{remote}.url");
        let cmd = git().args(["config", "--get", key.as_str()]);
        optional(self.shell.read(&cmd).await)
    }

    /// Returns `true` if tracked files have no uncommitted changes.
    ///
    /// # Errors
    ///
    /// Returns an error if the status cannot be read.
    pub async fn is_working_dir_clean(&self) -> GitResult<bool> {
        let cmd = git().args(["status", "--porcelain", "--untracked-files=no"]);
        let status = self.shell.read(&cmd).await?;
        Ok(status.is_empty())
    }

    /// Returns the upstream of the current branch, if one is set.
    ///
    /// # Errors
    ///
    /// Returns an error if git cannot be started.
    pub async fn upstream(&self) -> GitResult<Option<String>> {
        let cmd = git().args(["rev-parse", "--abbrev-ref", "--symbolic-full-name", "@{u}"]);
        optional(self.shell.read(&cmd).await)
    }

    /// Returns one `* subject (hash)` line per commit since the given tag.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read.
    pub async fn changelog_since(&self, tag: Option<&str>) -> GitResult<String> {
        let mut cmd = git().args(["log", "--pretty=format:* %s (%h)"]);
        if let Some(tag) = tag {
            cmd = cmd.arg(format!("{tag}...HEAD"));
        }
        Ok(self.shell.read(&cmd).await?)
    }

    /// Stages modifications of tracked files.
    ///
    /// # Errors
    ///
    /// Returns an error if staging fails.
    pub async fn stage_tracked(&self) -> GitResult<()> {
        self.shell.write(&git().args(["add", ".", "--update"])).await?;
        Ok(())
    }

    /// Creates a commit.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit cannot be created.
    pub async fn commit(&self, message: &str) -> GitResult<()> {
        self.shell
            .write(&git().args(["commit", "--message", message]))
            .await?;
        Ok(())
    }

    /// Creates an annotated tag.
    ///
    /// # Errors
    ///
    /// Returns an error if the tag cannot be created.
    pub async fn create_tag(&self, name: &str, message: &str) -> GitResult<()> {
        self.shell
            .write(&git().args(["tag", "--annotate", "--message", message, name]))
            .await?;
        Ok(())
    }

    /// Pushes the current branch with its tags.
    ///
    /// # Errors
    ///
    /// Returns an error if the push is rejected.
    pub async fn push(&self, remote: Option<&str>) -> GitResult<()> {
        let mut cmd = git().args(["push", "--follow-tags"]);
        if let Some(remote) = remote {
            cmd = cmd.arg(remote);
        }
        self.shell.write(&cmd).await?;
        Ok(())
    }
}

/// Maps a non-zero exit to `None`; spawn failures stay errors.
fn optional(result: Result<String, ExecError>) -> GitResult<Option<String>> {
    match result {
        Ok(out) if out.is_empty() => Ok(None),
        Ok(out) => Ok(Some(out)),
        Err(ExecError::Failed { command, .. }) => {
            debug!(%command, "git returned no value");
            Ok(None)
        }
        Err(err) => Err(GitError::Exec(err)),
    }
}
