//! Release orchestration.

use std::fmt;

use semver::Version;
use serde_json::json;
use shipyard_plugin::{PluginError, ReleaseContext, ReleaseTarget};
use tracing::{debug, error, info};

use crate::{CoreError, CoreResult, VersionManager, VersionTarget};

/// Outcome of one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetReport {
    /// Target name.
    pub name: String,
    /// Whether the release action succeeded.
    pub released: bool,
    /// Where the release can be seen.
    pub url: Option<String>,
}

/// Outcome of a release run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseReport {
    /// Released version.
    pub version: Version,
    /// Tag name, with prefix.
    pub tag_name: String,
    /// Per-target results, in registration order.
    pub targets: Vec<TargetReport>,
}

impl fmt::Display for ReleaseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Released {} ({})", self.version, self.tag_name)?;
        for target in &self.targets {
            let mark = if target.released { "✔" } else { "-" };
            match &target.url {
                Some(url) if target.released => writeln!(f, "  {mark} {}: {url}", target.name)?,
                _ => writeln!(f, "  {mark} {}", target.name)?,
            }
        }
        Ok(())
    }
}

/// Drives `init`, `bump` and `release` across release targets.
///
/// Each phase runs on every target, in registration order, before the next
/// phase starts. The first error aborts the run; work already done by
/// earlier targets is not undone.
pub struct Orchestrator {
    targets: Vec<Box<dyn ReleaseTarget>>,
    version_manager: VersionManager,
    tag_prefix: String,
}

impl Orchestrator {
    /// Creates an orchestrator without targets.
    #[must_use]
    pub fn new(tag_prefix: impl Into<String>) -> Self {
        Self {
            targets: Vec::new(),
            version_manager: VersionManager::new(),
            tag_prefix: tag_prefix.into(),
        }
    }

    /// Adds a release target.
    #[must_use]
    pub fn with_target(mut self, target: Box<dyn ReleaseTarget>) -> Self {
        self.targets.push(target);
        self
    }

    /// Returns the names of the registered targets.
    pub fn target_names(&self) -> Vec<&'static str> {
        self.targets.iter().map(|target| target.name()).collect()
    }

    /// Runs a release.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a target, or a version error.
    pub async fn run(
        &mut self,
        ctx: &mut ReleaseContext,
        target: VersionTarget,
    ) -> CoreResult<ReleaseReport> {
        if self.targets.is_empty() {
            return Err(CoreError::NoTargets);
        }
        info!(targets = ?self.target_names(), "starting release");

        for plugin in &mut self.targets {
            debug!(
                plugin = plugin.name(),
                version = plugin.version(),
                description = plugin.description(),
                "init"
            );
            plugin
                .init(ctx)
                .await
                .map_err(|err| failed("init", plugin.name(), err))?;
        }

        let latest = self.latest_version(ctx).await?;
        let version = match target {
            VersionTarget::Exact(version) => version,
            VersionTarget::Increment(increment) => {
                let next = self.version_manager.bump(&latest, &increment)?;
                info!(previous = %latest, %increment, next = %next, "calculated new version");
                next
            }
        };
        let tag_name = format!("{}{version}", self.tag_prefix);
        ctx.set(json!({
            "latestVersion": latest.to_string(),
            "version": version.to_string(),
            "tagName": tag_name,
            "isPreRelease": !version.pre.is_empty(),
        }));

        for plugin in &mut self.targets {
            debug!(plugin = plugin.name(), %version, "bump");
            plugin
                .bump(ctx, &version)
                .await
                .map_err(|err| failed("bump", plugin.name(), err))?;
        }

        for plugin in &mut self.targets {
            debug!(plugin = plugin.name(), "release");
            plugin
                .release(ctx)
                .await
                .map_err(|err| failed("release", plugin.name(), err))?;
        }

        for plugin in &self.targets {
            plugin
                .after_release(ctx)
                .await
                .map_err(|err| failed("after release", plugin.name(), err))?;
        }

        let targets = self
            .targets
            .iter()
            .map(|plugin| TargetReport {
                name: plugin.name().to_string(),
                released: plugin.is_released(),
                url: plugin.release_url(ctx),
            })
            .collect();

        info!(%version, %tag_name, "release completed");
        Ok(ReleaseReport {
            version,
            tag_name,
            targets,
        })
    }

    /// Returns the latest version reported by the first target that knows one.
    async fn latest_version(&self, ctx: &ReleaseContext) -> CoreResult<Version> {
        for plugin in &self.targets {
            if let Some(version) = plugin
                .latest_version(ctx)
                .await
                .map_err(|err| failed("latest version", plugin.name(), err))?
            {
                debug!(plugin = plugin.name(), %version, "latest version");
                return Ok(version);
            }
        }
        Ok(Version::new(0, 0, 0))
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("targets", &self.target_names())
            .field("tag_prefix", &self.tag_prefix)
            .finish_non_exhaustive()
    }
}

fn failed(phase: &str, plugin: &str, err: PluginError) -> CoreError {
    error!(plugin, phase, kind = ?err.kind(), error = %err, "release target failed");
    CoreError::Plugin(err)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use shipyard_plugin::{
        Plugin, PluginResult, PluginServices, ReleaseFlag, RunMode, ScriptedPrompter,
        StaticEnvironment, Step,
    };
    use shipyard_shell::{ScriptedRunner, ShellCommand};

    use super::*;
    use crate::Increment;

    type Calls = Arc<Mutex<Vec<String>>>;

    struct Recorder {
        name: &'static str,
        calls: Calls,
        latest: Option<Version>,
        fail_in: Option<&'static str>,
        services: Option<PluginServices>,
        released: ReleaseFlag,
    }

    impl Recorder {
        fn new(name: &'static str, calls: &Calls) -> Self {
            Self {
                name,
                calls: calls.clone(),
                latest: None,
                fail_in: None,
                services: None,
                released: ReleaseFlag::default(),
            }
        }

        fn note(&self, phase: &str) -> PluginResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("{}:{phase}", self.name));
            if self.fail_in == Some(phase) {
                return Err(PluginError::Precondition(format!("{} failed", self.name)));
            }
            Ok(())
        }
    }

    impl Plugin for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }
        fn version(&self) -> &'static str {
            "0.0.0"
        }
    }

    #[async_trait]
    impl ReleaseTarget for Recorder {
        async fn init(&mut self, _ctx: &mut ReleaseContext) -> PluginResult<()> {
            self.note("init")
        }

        async fn latest_version(&self, _ctx: &ReleaseContext) -> PluginResult<Option<Version>> {
            Ok(self.latest.clone())
        }

        async fn bump(&mut self, ctx: &mut ReleaseContext, version: &Version) -> PluginResult<()> {
            self.note("bump")?;
            ctx.set_path(&format!("{}.version", self.name), json!(version.to_string()));
            Ok(())
        }

        async fn release(&mut self, _ctx: &mut ReleaseContext) -> PluginResult<()> {
            self.note("release")?;
            if let Some(services) = &self.services {
                services
                    .shell
                    .write(&ShellCommand::new(self.name).arg("publish"))
                    .await?;
                services
                    .steps
                    .run(
                        Step::new(format!("{} announce", self.name)).side_effects(true),
                        |_| async { Ok(()) },
                    )
                    .await?;
            }
            self.released.mark();
            Ok(())
        }

        fn is_released(&self) -> bool {
            self.released.is_set()
        }

        fn release_url(&self, ctx: &ReleaseContext) -> Option<String> {
            let tag = ctx.get_str("tagName")?;
            Some(format!("https://{}.example.com/{tag}", self.name))
        }
    }

    fn calls() -> Calls {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[tokio::test]
    async fn test_phases_run_across_targets_in_order() {
        let calls = calls();
        let mut orchestrator = Orchestrator::new("v")
            .with_target(Box::new(Recorder::new("npm", &calls)))
            .with_target(Box::new(Recorder::new("github", &calls)));

        let mut ctx = ReleaseContext::new();
        orchestrator
            .run(&mut ctx, VersionTarget::Exact(Version::new(1, 0, 0)))
            .await
            .unwrap();

        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                "npm:init",
                "github:init",
                "npm:bump",
                "github:bump",
                "npm:release",
                "github:release"
            ]
        );
    }

    #[tokio::test]
    async fn test_first_error_aborts_remaining_phases() {
        let calls = calls();
        let mut failing = Recorder::new("github", &calls);
        failing.fail_in = Some("init");
        let mut orchestrator = Orchestrator::new("v")
            .with_target(Box::new(Recorder::new("npm", &calls)))
            .with_target(Box::new(failing))
            .with_target(Box::new(Recorder::new("git", &calls)));

        let mut ctx = ReleaseContext::new();
        let err = orchestrator
            .run(&mut ctx, VersionTarget::Exact(Version::new(1, 0, 0)))
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Plugin(PluginError::Precondition(_))));
        assert_eq!(*calls.lock().unwrap(), vec!["npm:init", "github:init"]);
    }

    #[tokio::test]
    async fn test_release_failure_keeps_earlier_releases() {
        let calls = calls();
        let mut failing = Recorder::new("github", &calls);
        failing.fail_in = Some("release");
        let mut orchestrator = Orchestrator::new("v")
            .with_target(Box::new(Recorder::new("npm", &calls)))
            .with_target(Box::new(failing));

        let mut ctx = ReleaseContext::new();
        assert!(
            orchestrator
                .run(&mut ctx, VersionTarget::Exact(Version::new(1, 0, 0)))
                .await
                .is_err()
        );
        assert!(calls.lock().unwrap().contains(&"npm:release".to_string()));
    }

    #[tokio::test]
    async fn test_increment_from_first_known_version() {
        let calls = calls();
        let mut git = Recorder::new("git", &calls);
        git.latest = Some(Version::new(2, 0, 1));
        let mut other = Recorder::new("npm", &calls);
        other.latest = Some(Version::new(9, 9, 9));
        let mut orchestrator = Orchestrator::new("v")
            .with_target(Box::new(Recorder::new("github", &calls)))
            .with_target(Box::new(git))
            .with_target(Box::new(other));

        let mut ctx = ReleaseContext::new();
        let report = orchestrator
            .run(&mut ctx, VersionTarget::Increment(Increment::Patch))
            .await
            .unwrap();

        assert_eq!(report.version, Version::new(2, 0, 2));
        assert_eq!(report.tag_name, "v2.0.2");
        assert_eq!(ctx.get_str("latestVersion"), Some("2.0.1"));
        assert_eq!(ctx.get_str("version"), Some("2.0.2"));
        assert_eq!(ctx.get_str("tagName"), Some("v2.0.2"));
        assert_eq!(ctx.get_bool("isPreRelease"), Some(false));
        assert_eq!(ctx.get_str("git.version"), Some("2.0.2"));
    }

    #[tokio::test]
    async fn test_increment_without_known_version() {
        let calls = calls();
        let mut orchestrator =
            Orchestrator::new("").with_target(Box::new(Recorder::new("npm", &calls)));

        let mut ctx = ReleaseContext::new();
        let report = orchestrator
            .run(&mut ctx, VersionTarget::Increment(Increment::Minor))
            .await
            .unwrap();
        assert_eq!(report.tag_name, "0.1.0");
        assert_eq!(ctx.get_str("latestVersion"), Some("0.0.0"));
    }

    #[tokio::test]
    async fn test_no_targets() {
        let mut orchestrator = Orchestrator::new("v");
        let err = orchestrator
            .run(
                &mut ReleaseContext::new(),
                VersionTarget::Exact(Version::new(1, 0, 0)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NoTargets));
    }

    #[tokio::test]
    async fn test_report() {
        let calls = calls();
        let mut orchestrator = Orchestrator::new("v")
            .with_target(Box::new(Recorder::new("npm", &calls)))
            .with_target(Box::new(Recorder::new("github", &calls)));

        let mut ctx = ReleaseContext::new();
        let report = orchestrator
            .run(&mut ctx, VersionTarget::Exact(Version::parse("1.0.0-next.1").unwrap()))
            .await
            .unwrap();

        assert_eq!(ctx.get_bool("isPreRelease"), Some(true));
        insta::assert_snapshot!(report.to_string(), @r"
        Released 1.0.0-next.1 (v1.0.0-next.1)
          ✔ npm: https://npm.example.com/v1.0.0-next.1
          ✔ github: https://github.example.com/v1.0.0-next.1
        ");
    }

    #[tokio::test]
    async fn test_dry_run_logs_same_operations_as_live() {
        async fn run(dry_run: bool) -> PluginServices {
            let services = PluginServices::new(
                RunMode { dry_run, ci: true },
                Arc::new(ScriptedRunner::new()),
                Arc::new(ScriptedPrompter::new()),
                Arc::new(StaticEnvironment::new()),
            );
            let calls = calls();
            let mut npm = Recorder::new("npm", &calls);
            npm.services = Some(services.clone());
            let mut github = Recorder::new("github", &calls);
            github.services = Some(services.clone());

            let mut orchestrator = Orchestrator::new("v")
                .with_target(Box::new(npm))
                .with_target(Box::new(github));
            let report = orchestrator
                .run(
                    &mut ReleaseContext::new(),
                    VersionTarget::Exact(Version::new(1, 0, 0)),
                )
                .await
                .unwrap();
            assert!(report.targets.iter().all(|target| target.released));
            services
        }

        let live = run(false).await;
        let dry = run(true).await;

        assert_eq!(live.log().operations(), dry.log().operations());
        insta::assert_snapshot!(dry.log().render(), @r"
        ! npm publish
        ! npm announce
        ! github publish
        ! github announce
        ");
    }
}
