//! Release target trait.

use async_trait::async_trait;
use semver::Version;
use tracing::info;

use super::Plugin;
use crate::{PluginResult, ReleaseContext};

/// Terminal success marker: once set, stays set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseFlag(bool);

impl ReleaseFlag {
    /// Marks the target as released.
    pub fn mark(&mut self) {
        self.0 = true;
    }

    /// Returns `true` once marked.
    #[must_use]
    pub fn is_set(self) -> bool {
        self.0
    }
}

/// One release destination driven through `init`, `bump` and `release`.
///
/// The orchestrator calls each phase on every target before moving to the
/// next phase.
#[async_trait]
pub trait ReleaseTarget: Plugin {
    /// Validates preconditions and records what the target knows.
    async fn init(&mut self, ctx: &mut ReleaseContext) -> PluginResult<()>;

    /// Returns the latest version this target knows of.
    async fn latest_version(&self, ctx: &ReleaseContext) -> PluginResult<Option<Version>> {
        let _ = ctx;
        Ok(None)
    }

    /// Records the new version locally and resolves release metadata.
    async fn bump(&mut self, ctx: &mut ReleaseContext, version: &Version) -> PluginResult<()>;

    /// Performs the release action.
    async fn release(&mut self, ctx: &mut ReleaseContext) -> PluginResult<()>;

    /// Runs after every target has released.
    async fn after_release(&self, ctx: &ReleaseContext) -> PluginResult<()> {
        if self.is_released()
            && let Some(url) = self.release_url(ctx)
        {
            info!(plugin = self.name(), %url, "released");
        }
        Ok(())
    }

    /// Returns `true` once the release action succeeded.
    fn is_released(&self) -> bool;

    /// Returns where the release can be seen.
    fn release_url(&self, ctx: &ReleaseContext) -> Option<String>;
}
