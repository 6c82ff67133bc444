//! Git release target for Shipyard.
//!
//! Commits the version bump, tags it and pushes both.

use async_trait::async_trait;
use semver::Version;
use serde_json::json;
use shipyard_config::GitConfig;
use shipyard_git::{GitError, Repository, version_from_tag};
use shipyard_plugin::{
    Plugin, PluginError, PluginResult, PluginServices, ReleaseContext, ReleaseFlag, ReleaseTarget,
    Step, within,
};
use tracing::{debug, info};

fn git_error(err: GitError) -> PluginError {
    match err {
        GitError::Exec(err) => PluginError::Exec(err),
        other => PluginError::Precondition(other.to_string()),
    }
}

/// Commits, tags and pushes the release.
#[derive(Debug)]
pub struct GitPlugin {
    config: GitConfig,
    services: PluginServices,
    tag_prefix: String,
    released: ReleaseFlag,
}

impl GitPlugin {
    /// Returns `true` when the target is switched on.
    pub fn is_enabled(config: &GitConfig) -> bool {
        config.enabled
    }

    /// Creates the target.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Config`] if an enabled commit or tag has an
    /// empty message.
    pub fn new(config: GitConfig, services: PluginServices) -> PluginResult<Self> {
        if config.commit && config.commit_message.trim().is_empty() {
            return Err(PluginError::Config(
                "git.commit_message must not be empty".to_string(),
            ));
        }
        if config.tag && config.tag_annotation.trim().is_empty() {
            return Err(PluginError::Config(
                "git.tag_annotation must not be empty".to_string(),
            ));
        }
        Ok(Self {
            config,
            services,
            tag_prefix: "v".to_string(),
            released: ReleaseFlag::default(),
        })
    }

    /// Sets the prefix stripped from tags to read versions.
    #[must_use]
    pub fn with_tag_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.tag_prefix = prefix.into();
        self
    }

    fn repository(&self) -> Repository {
        Repository::new(self.services.shell.clone())
    }
}

impl Plugin for GitPlugin {
    fn name(&self) -> &'static str {
        "git"
    }

    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    fn description(&self) -> &'static str {
        "Commits, tags and pushes the release"
    }
}

#[async_trait]
impl ReleaseTarget for GitPlugin {
    async fn init(&mut self, ctx: &mut ReleaseContext) -> PluginResult<()> {
        let git = self.repository();
        if !git.is_repository().await.map_err(git_error)? {
            return Err(git_error(GitError::NotARepo));
        }

        let (clean, upstream, latest_tag) = within("git validation", self.config.timeout(), async {
            Ok(tokio::join!(
                git.is_working_dir_clean(),
                git.upstream(),
                git.latest_tag(),
            ))
        })
        .await?;

        if self.config.require_clean_working_dir && !clean.map_err(git_error)? {
            return Err(PluginError::Precondition(
                "Working dir must be clean. Please stage and commit your changes.".to_string(),
            ));
        }
        let upstream = upstream.map_err(git_error)?;
        if self.config.push && self.config.require_upstream && upstream.is_none() {
            return Err(PluginError::Precondition(
                "No upstream configured for current branch. Please set an upstream branch."
                    .to_string(),
            ));
        }
        let latest_tag = latest_tag.map_err(git_error)?;

        debug!(?upstream, ?latest_tag, "git state");
        ctx.set(json!({
            "git": {
                "upstream": upstream,
                "latestTag": latest_tag,
            }
        }));
        Ok(())
    }

    async fn latest_version(&self, ctx: &ReleaseContext) -> PluginResult<Option<Version>> {
        Ok(ctx
            .get_str("git.latestTag")
            .and_then(|tag| version_from_tag(tag, &self.tag_prefix)))
    }

    async fn bump(&mut self, ctx: &mut ReleaseContext, version: &Version) -> PluginResult<()> {
        let version_str = version.to_string();
        let tag_name = ctx
            .get_str("tagName")
            .map_or_else(|| format!("{}{version_str}", self.tag_prefix), ToString::to_string);
        ctx.set(json!({
            "git": {
                "tagName": tag_name,
                "commitMessage": self.config.commit_message.replace("{version}", &version_str),
                "tagAnnotation": self.config.tag_annotation.replace("{version}", &version_str),
            }
        }));
        Ok(())
    }

    async fn release(&mut self, ctx: &mut ReleaseContext) -> PluginResult<()> {
        if self.released.is_set() {
            debug!("git release already done");
            return Ok(());
        }
        let git = &self.repository();
        let steps = &self.services.steps;
        let message = ctx.get_str("git.commitMessage").unwrap_or_default();
        let tag_name = ctx.get_str("git.tagName").unwrap_or_default();
        let annotation = ctx.get_str("git.tagAnnotation").unwrap_or_default();
        let remote = self.config.push_remote.as_deref();

        let commit = Step::new("Git commit")
            .prompt("commit", format!("Commit ({message})?"))
            .enabled(self.config.commit);
        let committed = steps
            .run(commit, move |_| async move {
                git.stage_tracked().await.map_err(git_error)?;
                git.commit(message).await.map_err(git_error)
            })
            .await?;

        let tag = Step::new("Git tag")
            .prompt("tag", format!("Tag ({tag_name})?"))
            .enabled(self.config.tag);
        let tagged = steps
            .run(tag, move |_| async move {
                git.create_tag(tag_name, annotation).await.map_err(git_error)
            })
            .await?;

        let push = Step::new("Git push")
            .prompt("push", format!("Push ({})?", remote.unwrap_or("upstream")))
            .enabled(self.config.push);
        let pushed = steps
            .run(push, move |_| async move { git.push(remote).await.map_err(git_error) })
            .await?;

        if committed.is_done() || tagged.is_done() || pushed.is_done() {
            info!(tag = tag_name, "git release done");
            self.released.mark();
        }
        Ok(())
    }

    fn is_released(&self) -> bool {
        self.released.is_set()
    }

    fn release_url(&self, _ctx: &ReleaseContext) -> Option<String> {
        None
    }
}
