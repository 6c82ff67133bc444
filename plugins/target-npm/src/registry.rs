//! npm CLI calls.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use semver::Version;
use serde_json::{Map, Value};
use shipyard_plugin::{PluginError, PluginResult, RemoteError, RetryPolicy};
use shipyard_shell::{ExecError, Shell, ShellCommand};
use tracing::{debug, warn};

/// Registries that do not implement `ping` or `whoami` answer with a 404.
/// Such an answer counts as success.
static UNSUPPORTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"code E40[04]|404.*(ping not found|No content for path)").expect("invalid regex")
});

/// The public registry.
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org";

fn npm() -> ShellCommand {
    ShellCommand::new("npm")
}

fn is_unsupported(err: &ExecError) -> bool {
    err.output().is_some_and(|output| UNSUPPORTED.is_match(output))
}

/// Runs npm through the shell, against one registry.
#[derive(Debug, Clone)]
pub(crate) struct NpmClient {
    shell: Arc<Shell>,
    retry: RetryPolicy,
    registry: Option<String>,
}

impl NpmClient {
    pub(crate) fn new(shell: Arc<Shell>, retry: RetryPolicy, registry: Option<String>) -> Self {
        Self {
            shell,
            retry,
            registry,
        }
    }

    fn registry_arg(&self, cmd: ShellCommand) -> ShellCommand {
        cmd.opt("--registry", self.registry.as_deref())
    }

    /// Checks that the registry answers.
    pub(crate) async fn ping(&self) -> PluginResult<()> {
        match self.shell.read(&self.registry_arg(npm().arg("ping"))).await {
            Ok(_) => Ok(()),
            Err(err) if is_unsupported(&err) => {
                warn!("Ignoring response from unsupported `npm ping` command.");
                Ok(())
            }
            Err(err) => {
                debug!(error = %err, "npm ping failed");
                Err(PluginError::Precondition(
                    "Unable to reach npm registry".to_string(),
                ))
            }
        }
    }

    /// Returns the logged-in user; `None` when the registry cannot tell.
    pub(crate) async fn whoami(&self) -> PluginResult<Option<String>> {
        match self.shell.read(&self.registry_arg(npm().arg("whoami"))).await {
            Ok(user) => Ok(Some(user).filter(|user| !user.is_empty())),
            Err(err) if is_unsupported(&err) => {
                warn!("Ignoring response from unsupported `npm whoami` command.");
                Ok(None)
            }
            Err(err) => {
                debug!(error = %err, "npm whoami failed");
                Err(PluginError::Auth(
                    "Not authenticated with npm. Please `npm login` and try again.".to_string(),
                ))
            }
        }
    }

    /// Returns the version published under `tag`, if any.
    pub(crate) async fn published_version(&self, name: &str, tag: &str) -> Option<String> {
        let cmd = self.registry_arg(npm().arg("show").arg(format!("{name}@{tag}")).arg("version"));
        let shell = &self.shell;
        let cmd = &cmd;
        match self
            .retry
            .run("npm show", move || async move {
                shell.read(cmd).await.map_err(RemoteError::from)
            })
            .await
        {
            Ok(version) => Some(version).filter(|v| !v.is_empty()),
            Err(err) => {
                debug!(error = %err, "no published version");
                None
            }
        }
    }

    /// Returns `true` unless the registry says `user` cannot write to `name`.
    ///
    /// Failures to run the check only warn.
    pub(crate) async fn is_collaborator(&self, name: &str, user: &str) -> bool {
        let list_command = match self.shell.read(&npm().arg("--version")).await {
            Ok(version) => Version::parse(version.trim())
                .is_ok_and(|version| version > Version::new(9, 0, 0)),
            Err(err) => {
                debug!(error = %err, "npm --version failed");
                false
            }
        };
        let cmd = if list_command {
            npm().args(["access", "list", "collaborators", "--json", name])
        } else {
            npm().args(["access", "ls-collaborators", name])
        };

        let output = match self.shell.read(&self.registry_arg(cmd)).await {
            Ok(output) => output,
            Err(err) => {
                if err.output().is_some_and(|output| output.contains("code E400")) {
                    warn!("Ignoring response from unsupported `npm access` command.");
                } else {
                    warn!("Unable to verify if user {user} is a collaborator for {name}.");
                }
                return true;
            }
        };

        match serde_json::from_str::<Map<String, Value>>(&output) {
            Ok(collaborators) => collaborators
                .get(user)
                .and_then(Value::as_str)
                .is_some_and(|permissions| permissions.contains("write")),
            Err(err) => {
                debug!(error = %err, "unreadable collaborator list");
                false
            }
        }
    }

    /// Returns published dist-tags other than `latest`, in registry order.
    pub(crate) async fn pre_release_tags(&self, name: &str) -> Vec<String> {
        let cmd = self.registry_arg(npm().args(["view", name, "dist-tags", "--json"]));
        let shell = &self.shell;
        let cmd = &cmd;
        let output = self
            .retry
            .run("npm view", move || async move {
                shell.read(cmd).await.map_err(RemoteError::from)
            })
            .await;

        match output.map(|out| serde_json::from_str::<Map<String, Value>>(&out)) {
            Ok(Ok(tags)) => tags
                .keys()
                .filter(|tag| tag.as_str() != shipyard_plugin::DEFAULT_CHANNEL)
                .cloned()
                .collect(),
            Ok(Err(err)) => {
                debug!(error = %err, "unreadable dist-tags");
                Vec::new()
            }
            Err(err) => {
                debug!(error = %err, "npm view failed");
                Vec::new()
            }
        }
    }

    /// Writes the version into the manifest.
    pub(crate) async fn set_version(&self, version: &Version) -> PluginResult<()> {
        let cmd = npm()
            .arg("version")
            .arg(version.to_string())
            .arg("--no-git-tag-version");
        match self.shell.write(&cmd).await {
            Ok(_) => Ok(()),
            Err(err)
                if err
                    .output()
                    .is_some_and(|out| out.to_lowercase().contains("version not changed")) =>
            {
                debug!(%version, "version not changed");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Publishes the package.
    pub(crate) async fn publish(
        &self,
        path: &str,
        tag: &str,
        otp: Option<&str>,
        extra: &[String],
    ) -> PluginResult<()> {
        let cmd = npm()
            .args(["publish", path, "--tag", tag])
            .opt("--otp", otp);
        let cmd = self.registry_arg(cmd).args(extra);
        self.shell.write(&cmd).await?;
        Ok(())
    }
}
