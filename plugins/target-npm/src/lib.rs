//! npm registry release target for Shipyard.
//!
//! Validates that the registry is reachable and the user may publish,
//! writes the new version into `package.json`, picks a dist-tag and
//! publishes the package.

mod manifest;
mod registry;

use std::path::Path;

use async_trait::async_trait;
use semver::Version;
use serde_json::json;
use shipyard_config::NpmConfig;
use shipyard_plugin::{
    DEFAULT_PRERELEASE_CHANNEL, ParsedVersion, Plugin, PluginError, PluginResult, PluginServices,
    ReleaseContext, ReleaseFlag, ReleaseTarget, Step, within,
};
use tracing::{debug, info, warn};

pub use manifest::Manifest;
pub use registry::DEFAULT_REGISTRY;

use registry::NpmClient;

/// Publishes a package to an npm registry.
#[derive(Debug)]
pub struct NpmPlugin {
    config: NpmConfig,
    services: PluginServices,
    manifest: Option<Manifest>,
    released: ReleaseFlag,
}

impl NpmPlugin {
    /// Returns `true` when the target is switched on and a manifest exists.
    pub fn is_enabled(config: &NpmConfig) -> bool {
        config.enabled && Path::new(&config.manifest).is_file()
    }

    /// Creates the target.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Config`] if the publish path is empty.
    pub fn new(config: NpmConfig, services: PluginServices) -> PluginResult<Self> {
        if config.publish_path.trim().is_empty() {
            return Err(PluginError::Config(
                "npm.publish_path must not be empty".to_string(),
            ));
        }
        Ok(Self {
            config,
            services,
            manifest: None,
            released: ReleaseFlag::default(),
        })
    }

    fn manifest(&self) -> PluginResult<&Manifest> {
        self.manifest
            .as_ref()
            .ok_or_else(|| PluginError::Precondition("npm target was not initialized".to_string()))
    }

    fn client(&self) -> NpmClient {
        NpmClient::new(
            self.services.shell.clone(),
            self.services.retry,
            self.manifest
                .as_ref()
                .and_then(Manifest::registry)
                .map(String::from),
        )
    }

    async fn validate(&self, ctx: &mut ReleaseContext, manifest: &Manifest) -> PluginResult<()> {
        let npm = self.client();
        let (reachable, user, published) = within(
            "npm validation",
            self.config.timeout(),
            async {
                Ok(tokio::join!(
                    npm.ping(),
                    npm.whoami(),
                    npm.published_version(&manifest.name, shipyard_plugin::DEFAULT_CHANNEL),
                ))
            },
        )
        .await?;
        reachable?;
        let user = user?;

        ctx.set_path("npm.username", json!(user));
        ctx.set_path("npm.registryVersion", json!(published));

        if let Some(user) = &user
            && !npm.is_collaborator(&manifest.name, user).await
        {
            return Err(PluginError::Authorization(format!(
                "User {user} is not a collaborator for {}.",
                manifest.name
            )));
        }

        match (&published, &manifest.version) {
            (None, _) => warn!("No version found in npm registry. Assuming new package."),
            (Some(published), Some(local)) if published != local => warn!(
                "Latest version in registry ({published}) does not match package.json ({local})."
            ),
            _ => {}
        }
        Ok(())
    }

    async fn resolve_channel(&self, name: &str, version: &ParsedVersion) -> String {
        if let Some(channel) = version.explicit_channel(self.config.tag.as_deref()) {
            return channel;
        }
        match self.client().pre_release_tags(name).await.into_iter().next() {
            Some(tag) => tag,
            None => {
                warn!(
                    "Unable to get pre-release tag(s) from npm registry. Using \"{DEFAULT_PRERELEASE_CHANNEL}\"."
                );
                DEFAULT_PRERELEASE_CHANNEL.to_string()
            }
        }
    }
}

impl Plugin for NpmPlugin {
    fn name(&self) -> &'static str {
        "npm"
    }

    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    fn description(&self) -> &'static str {
        "Publishes the package to an npm registry"
    }
}

#[async_trait]
impl ReleaseTarget for NpmPlugin {
    async fn init(&mut self, ctx: &mut ReleaseContext) -> PluginResult<()> {
        let manifest = Manifest::load(&self.config.manifest)?;
        ctx.set(json!({
            "npm": {
                "name": manifest.name,
                "latestVersion": manifest.version,
                "private": manifest.private,
                "registry": manifest.registry(),
            }
        }));
        self.manifest = Some(manifest.clone());

        if !self.config.publish || manifest.private {
            debug!(name = %manifest.name, "publishing disabled, skipping checks");
            return Ok(());
        }
        if self.config.skip_checks {
            debug!("npm checks skipped");
            return Ok(());
        }
        self.validate(ctx, &manifest).await
    }

    async fn latest_version(&self, ctx: &ReleaseContext) -> PluginResult<Option<Version>> {
        ctx.get_str("npm.latestVersion")
            .map(|version| ParsedVersion::parse(version).map(|parsed| parsed.version().clone()))
            .transpose()
    }

    async fn bump(&mut self, ctx: &mut ReleaseContext, version: &Version) -> PluginResult<()> {
        let name = self.manifest()?.name.clone();
        let parsed = ParsedVersion::from(version.clone());
        let tag = self.resolve_channel(&name, &parsed).await;
        ctx.set_path("npm.tag", json!(tag));

        if self.manifest()?.version.as_deref() == Some(version.to_string().as_str()) {
            debug!(%version, "package.json already at version");
            return Ok(());
        }
        self.client().set_version(version).await
    }

    async fn release(&mut self, ctx: &mut ReleaseContext) -> PluginResult<()> {
        if self.released.is_set() {
            debug!("npm package already published");
            return Ok(());
        }
        if !self.config.publish {
            warn!("Skip publish: publishing to npm is disabled.");
            return Ok(());
        }
        let manifest = self.manifest()?;
        if manifest.private {
            warn!("Skip publish: package is private.");
            return Ok(());
        }

        let tag = ctx
            .get_str("npm.tag")
            .unwrap_or(shipyard_plugin::DEFAULT_CHANNEL)
            .to_string();
        let version = ctx.get_str("version").unwrap_or_default();
        let step = Step::new("npm publish")
            .prompt(
                "publish",
                format!("Publish {}@{version} to npm (tag {tag})?", manifest.name),
            )
            .otp(self.config.otp.clone());

        let npm = &self.client();
        let path = self.config.publish_path.as_str();
        let extra = self.config.publish_args.as_slice();
        let tag = tag.as_str();
        let outcome = self
            .services
            .steps
            .run(step, move |otp| async move {
                npm.publish(path, tag, otp.as_deref(), extra).await
            })
            .await?;

        if outcome.is_done() {
            self.released.mark();
            ctx.set_path("npm.isReleased", json!(true));
            info!(tag, "published to npm");
        }
        Ok(())
    }

    fn is_released(&self) -> bool {
        self.released.is_set()
    }

    fn release_url(&self, ctx: &ReleaseContext) -> Option<String> {
        let name = ctx.get_str("npm.name")?;
        match ctx.get_str("npm.registry") {
            Some(registry) if registry.trim_end_matches('/') != DEFAULT_REGISTRY => Some(format!(
                "{}/package/{name}",
                registry.trim_end_matches('/')
            )),
            _ => Some(format!("https://www.npmjs.com/package/{name}")),
        }
    }
}
