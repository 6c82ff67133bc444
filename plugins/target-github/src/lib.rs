//! GitHub Releases target for Shipyard.
//!
//! Checks the token and the user's permissions, then creates a draft
//! release for the new tag, uploads assets and publishes it.

mod api;

use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use semver::Version;
use serde_json::json;
use shipyard_config::GithubConfig;
use shipyard_git::{GitError, RepoInfo, Repository};
use shipyard_plugin::{
    ParsedVersion, Plugin, PluginError, PluginResult, PluginServices, ReleaseContext, ReleaseFlag,
    ReleaseTarget, RetryPolicy, Step, StepOutcome, within,
};
use tracing::{debug, info, warn};

pub use api::{Asset, DEFAULT_HOST, HttpReleaseApi, Release, ReleaseApi, ReleaseDraft, api_base};

fn git_error(err: GitError) -> PluginError {
    match err {
        GitError::Exec(err) => PluginError::Exec(err),
        other => PluginError::Precondition(other.to_string()),
    }
}

/// Returns the draft created by an earlier, interrupted `release`.
fn created_release(ctx: &ReleaseContext) -> Option<Release> {
    Some(Release {
        id: ctx.get_u64("github.releaseId")?,
        html_url: ctx.get_str("github.releaseUrl")?.to_string(),
        upload_url: ctx.get_str("github.uploadUrl")?.to_string(),
        draft: true,
    })
}

fn no_release() -> PluginError {
    PluginError::Precondition("no draft release was created".to_string())
}

/// Creates a release on GitHub or GitHub Enterprise.
pub struct GithubPlugin {
    config: GithubConfig,
    services: PluginServices,
    api: Option<Arc<dyn ReleaseApi>>,
    repo: Option<RepoInfo>,
    released: ReleaseFlag,
}

impl GithubPlugin {
    /// Returns `true` when releases are switched on.
    pub fn is_enabled(config: &GithubConfig) -> bool {
        config.release
    }

    /// Creates the target.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Config`] if the repository is not `owner/repo`
    /// or no token variable is named.
    pub fn new(config: GithubConfig, services: PluginServices) -> PluginResult<Self> {
        if config.token_ref.trim().is_empty() {
            return Err(PluginError::Config(
                "github.token_ref must name an environment variable".to_string(),
            ));
        }
        if let Some(slug) = &config.repository {
            RepoInfo::from_slug(DEFAULT_HOST, slug)
                .map_err(|_| PluginError::Config(format!("invalid github.repository: {slug}")))?;
        }
        Ok(Self {
            config,
            services,
            api: None,
            repo: None,
            released: ReleaseFlag::default(),
        })
    }

    /// Uses the given API client instead of one built from the token.
    #[must_use]
    pub fn with_api(mut self, api: Arc<dyn ReleaseApi>) -> Self {
        self.api = Some(api);
        self
    }

    fn repo(&self) -> PluginResult<&RepoInfo> {
        self.repo
            .as_ref()
            .ok_or_else(|| PluginError::Precondition("github target was not initialized".to_string()))
    }

    fn api(&self) -> PluginResult<Arc<dyn ReleaseApi>> {
        self.api
            .clone()
            .ok_or_else(|| PluginError::Precondition("github target was not initialized".to_string()))
    }

    async fn resolve_repository(&self, git: &Repository) -> PluginResult<RepoInfo> {
        let mut repo = match &self.config.repository {
            Some(slug) => RepoInfo::from_slug(DEFAULT_HOST, slug).map_err(git_error)?,
            None => {
                let remote = git.remote_url("origin").await.map_err(git_error)?.ok_or_else(|| {
                    PluginError::Precondition(
                        "Could not determine the repository: set github.repository or add an `origin` remote."
                            .to_string(),
                    )
                })?;
                RepoInfo::parse(&remote).map_err(git_error)?
            }
        };
        if let Some(host) = &self.config.host {
            repo.host.clone_from(host);
        }
        Ok(repo)
    }

    async fn verify(&self, api: &dyn ReleaseApi, repo: &RepoInfo) -> PluginResult<String> {
        let retry = &self.services.retry;

        let user = retry
            .run("GitHub authenticate", || api.authenticate())
            .await
            .map_err(|err| match err {
                PluginError::Client {
                    status: Some(401 | 403),
                    message,
                } => {
                    debug!(%message, "authentication rejected");
                    PluginError::Auth(format!(
                        "Could not authenticate with GitHub using environment variable \"{}\".",
                        self.config.token_ref
                    ))
                }
                other => other,
            })?;

        let user_ref = user.as_str();
        let allowed = retry
            .run("GitHub collaborator check", move || {
                api.check_collaborator(repo, user_ref)
            })
            .await?;
        if !allowed {
            return Err(PluginError::Authorization(format!(
                "User {user} is not a collaborator for {}.",
                repo.slug()
            )));
        }
        Ok(user)
    }

    fn matched_assets(&self) -> PluginResult<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for pattern in &self.config.assets {
            let entries = glob::glob(pattern).map_err(|e| {
                PluginError::Config(format!("invalid asset pattern {pattern}: {e}"))
            })?;
            paths.extend(entries.filter_map(Result::ok).filter(|path| path.is_file()));
        }
        if paths.is_empty() && !self.config.assets.is_empty() {
            warn!(patterns = ?self.config.assets, "no assets matched");
        }
        Ok(paths)
    }
}

async fn upload(
    api: &dyn ReleaseApi,
    retry: &RetryPolicy,
    release: &Release,
    path: &Path,
) -> PluginResult<Asset> {
    let name = path
        .file_name()
        .and_then(OsStr::to_str)
        .ok_or_else(|| PluginError::Config(format!("invalid asset path {}", path.display())))?;
    let content = tokio::fs::read(path).await?;
    debug!(asset = name, size = content.len(), "uploading");
    retry
        .run("GitHub upload asset", move || {
            api.upload_asset(release, name, content.clone())
        })
        .await
}

impl fmt::Debug for GithubPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubPlugin")
            .field("config", &self.config)
            .field("repo", &self.repo)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

impl Plugin for GithubPlugin {
    fn name(&self) -> &'static str {
        "github"
    }

    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    fn description(&self) -> &'static str {
        "Creates GitHub Releases and uploads assets"
    }
}

#[async_trait]
impl ReleaseTarget for GithubPlugin {
    async fn init(&mut self, ctx: &mut ReleaseContext) -> PluginResult<()> {
        let token = self
            .services
            .env
            .non_empty(&self.config.token_ref)
            .ok_or_else(|| {
                PluginError::missing_variable(&self.config.token_ref, "automated GitHub Releases")
            })?;

        let git = Repository::new(self.services.shell.clone());
        let repo = self.resolve_repository(&git).await?;
        let latest_tag = git.latest_tag().await.map_err(git_error)?;
        ctx.set(json!({
            "github": {
                "host": repo.host,
                "owner": repo.owner,
                "repo": repo.name,
                "repository": repo.slug(),
                "latestTag": latest_tag,
            }
        }));

        let api = match &self.api {
            Some(api) => api.clone(),
            None => {
                let api: Arc<dyn ReleaseApi> = Arc::new(HttpReleaseApi::new(&repo.host, token)?);
                self.api = Some(api.clone());
                api
            }
        };
        self.repo = Some(repo.clone());

        if self.config.skip_checks {
            debug!("GitHub checks skipped");
            return Ok(());
        }
        if let Some(actor) = self.services.env.trusted_actor() {
            info!(%actor, "using trusted CI identity");
            ctx.set_path("github.username", json!(actor));
            return Ok(());
        }

        let user = within(
            "GitHub validation",
            self.config.timeout(),
            self.verify(api.as_ref(), &repo),
        )
        .await?;
        ctx.set_path("github.username", json!(user));
        Ok(())
    }

    async fn latest_version(&self, ctx: &ReleaseContext) -> PluginResult<Option<Version>> {
        Ok(ctx
            .get_str("github.latestTag")
            .and_then(|tag| ParsedVersion::parse(tag).ok())
            .map(|parsed| parsed.version().clone()))
    }

    async fn bump(&mut self, ctx: &mut ReleaseContext, version: &Version) -> PluginResult<()> {
        let version_str = version.to_string();
        let tag_name = ctx
            .get_str("tagName")
            .map_or_else(|| version_str.clone(), ToString::to_string);
        let release_name = self.config.release_name.replace("{version}", &version_str);
        let notes = match &self.config.release_notes {
            Some(notes) => notes.replace("{version}", &version_str),
            None => Repository::new(self.services.shell.clone())
                .changelog_since(ctx.get_str("github.latestTag"))
                .await
                .map_err(git_error)?,
        };
        let pre_release = self.config.pre_release.unwrap_or(!version.pre.is_empty());

        ctx.set(json!({
            "github": {
                "tagName": tag_name,
                "releaseName": release_name,
                "releaseNotes": notes,
                "isPreRelease": pre_release,
            }
        }));
        Ok(())
    }

    async fn release(&mut self, ctx: &mut ReleaseContext) -> PluginResult<()> {
        if self.released.is_set() {
            debug!("GitHub release already done");
            return Ok(());
        }
        let repo = self.repo()?.clone();
        let api = self.api()?;
        let assets = self.matched_assets()?;
        let draft = ReleaseDraft {
            tag_name: ctx.get_str("github.tagName").unwrap_or_default().to_string(),
            name: ctx.get_str("github.releaseName").unwrap_or_default().to_string(),
            body: ctx.get_str("github.releaseNotes").unwrap_or_default().to_string(),
            prerelease: ctx.get_bool("github.isPreRelease").unwrap_or(false),
        };

        let steps = &self.services.steps;
        let retry = &self.services.retry;
        let (api_ref, repo_ref, draft_ref) = (api.as_ref(), &repo, &draft);

        let release = if let Some(existing) = created_release(ctx) {
            debug!(id = existing.id, "reusing draft release");
            Some(existing)
        } else {
            let create = Step::new("GitHub create release")
                .prompt(
                    "release",
                    format!("Create a release on GitHub ({})?", draft.tag_name),
                )
                .side_effects(true);
            let created = steps
                .run(create, move |_| {
                    retry.run("GitHub create release", move || {
                        api_ref.create_draft_release(repo_ref, draft_ref)
                    })
                })
                .await?;
            match created {
                StepOutcome::Skipped => return Ok(()),
                StepOutcome::Simulated => None,
                StepOutcome::Completed(release) => {
                    ctx.set(json!({
                        "github": {
                            "releaseId": release.id,
                            "releaseUrl": release.html_url,
                            "uploadUrl": release.upload_url,
                        }
                    }));
                    Some(release)
                }
            }
        };
        let release_ref = release.as_ref();

        let already_uploaded = ctx.get_bool("github.assetsUploaded").unwrap_or(false);
        let uploads = Step::new("GitHub upload assets")
            .side_effects(true)
            .enabled(!assets.is_empty() && !already_uploaded);
        let assets_ref = assets.as_slice();
        let uploaded = steps
            .run(uploads, move |_| async move {
                let release = release_ref.ok_or_else(no_release)?;
                for path in assets_ref {
                    let asset = upload(api_ref, retry, release, path).await?;
                    info!(asset = %asset.name, url = %asset.browser_download_url, "uploaded");
                }
                Ok(())
            })
            .await?;
        if matches!(uploaded, StepOutcome::Completed(())) {
            ctx.set_path("github.assetsUploaded", json!(true));
        }

        let publish = Step::new("GitHub publish release")
            .side_effects(true)
            .enabled(!self.config.draft);
        let published = steps
            .run(publish, move |_| async move {
                let release = release_ref.ok_or_else(no_release)?;
                retry
                    .run("GitHub publish release", move || {
                        api_ref.publish_release(repo_ref, release.id)
                    })
                    .await
            })
            .await?;

        let final_release = published.completed().or(release);
        if let Some(release) = &final_release {
            ctx.set(json!({
                "github": {
                    "releaseId": release.id,
                    "releaseUrl": release.html_url,
                }
            }));
        }
        self.released.mark();
        ctx.set_path("github.isReleased", json!(true));
        Ok(())
    }

    fn is_released(&self) -> bool {
        self.released.is_set()
    }

    fn release_url(&self, ctx: &ReleaseContext) -> Option<String> {
        if let Some(url) = ctx.get_str("github.releaseUrl") {
            return Some(url.to_string());
        }
        let host = ctx.get_str("github.host")?;
        let owner = ctx.get_str("github.owner")?;
        let repo = ctx.get_str("github.repo")?;
        let tag = ctx.get_str("github.tagName")?;
        Some(format!("https://{host}/{owner}/{repo}/releases/tag/{tag}"))
    }
}
