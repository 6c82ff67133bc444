//! Release command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, ValueEnum};
use semver::Version;
use shipyard_config::{Config, ConfigError, find_and_load_config, load_config};
use shipyard_core::{Increment, Orchestrator, VersionTarget};
use shipyard_plugin::{
    DialoguerPrompter, Environment, PluginServices, ProcessEnvironment, ReleaseContext,
    RetryPolicy, RunMode,
};
use shipyard_shell::SystemRunner;
use shipyard_target_git::GitPlugin;
use shipyard_target_github::GithubPlugin;
use shipyard_target_npm::NpmPlugin;
use tracing::{debug, info};

/// Version increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IncrementArg {
    Major,
    Minor,
    Patch,
    Prerelease,
}

/// Arguments for the release command.
#[derive(Debug, Args)]
pub struct ReleaseArgs {
    /// Release exactly this version instead of incrementing
    #[arg(value_name = "VERSION")]
    pub exact: Option<String>,

    /// Increment to apply to the latest version
    #[arg(short, long, value_enum, conflicts_with = "exact")]
    pub increment: Option<IncrementArg>,

    /// Pre-release channel (e.g. beta)
    #[arg(long, conflicts_with = "exact")]
    pub preid: Option<String>,

    /// Show what would be done without changing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Never prompt; detected from the environment when not set
    #[arg(long)]
    pub ci: bool,

    /// Path to the configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl ReleaseArgs {
    fn version_target(&self) -> Result<VersionTarget> {
        if let Some(version) = &self.exact {
            let version = Version::parse(version.trim_start_matches('v'))
                .with_context(|| format!("invalid version \"{version}\""))?;
            return Ok(VersionTarget::Exact(version));
        }

        let increment = match (self.increment, &self.preid) {
            (None | Some(IncrementArg::Patch), None) => Increment::Patch,
            (Some(IncrementArg::Major), None) => Increment::Major,
            (Some(IncrementArg::Minor), None) => Increment::Minor,
            (None | Some(IncrementArg::Prerelease), preid) => Increment::PreRelease(preid.clone()),
            (Some(increment), Some(_)) => {
                bail!("--preid only applies to prerelease increments, not {increment:?}")
            }
        };
        Ok(VersionTarget::Increment(increment))
    }
}

/// Runs the release command.
pub fn run(args: &ReleaseArgs) -> Result<()> {
    let config = load(args.config.as_deref())?;
    let target = args.version_target()?;

    let env: Arc<dyn Environment> = Arc::new(ProcessEnvironment);
    let mode = RunMode {
        dry_run: args.dry_run,
        ci: args.ci || env.is_ci(),
    };
    debug!(?mode, ?target, "release requested");

    let rt = tokio::runtime::Runtime::new().context("failed to create async runtime")?;
    rt.block_on(release(&config, mode, env, target))
}

fn load(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path {
        return load_config(path)
            .with_context(|| format!("failed to load {}", path.display()));
    }
    match find_and_load_config() {
        Ok(config) => Ok(config),
        Err(ConfigError::NotFound(_)) => {
            info!("no configuration file found, using defaults");
            Ok(Config::default())
        }
        Err(err) => Err(err).context("failed to load configuration"),
    }
}

fn retry_policy(config: &Config) -> RetryPolicy {
    RetryPolicy::new()
        .with_max_attempts(config.retry.max_attempts)
        .with_min_timeout(config.retry.min_timeout())
        .with_factor(config.retry.factor)
        .with_max_timeout(config.retry.max_timeout())
}

fn orchestrator(config: &Config, services: &PluginServices) -> Result<Orchestrator> {
    let prefix = &config.version.tag_prefix;
    let mut orchestrator = Orchestrator::new(prefix.clone());

    if NpmPlugin::is_enabled(&config.npm) {
        let npm = NpmPlugin::new(config.npm.clone(), services.clone())?;
        orchestrator = orchestrator.with_target(Box::new(npm));
    }
    if GitPlugin::is_enabled(&config.git) {
        let git = GitPlugin::new(config.git.clone(), services.clone())?.with_tag_prefix(prefix);
        orchestrator = orchestrator.with_target(Box::new(git));
    }
    if GithubPlugin::is_enabled(&config.github) {
        let github = GithubPlugin::new(config.github.clone(), services.clone())?;
        orchestrator = orchestrator.with_target(Box::new(github));
    }
    Ok(orchestrator)
}

async fn release(
    config: &Config,
    mode: RunMode,
    env: Arc<dyn Environment>,
    target: VersionTarget,
) -> Result<()> {
    let services = PluginServices::new(
        mode,
        Arc::new(SystemRunner::new()),
        Arc::new(DialoguerPrompter),
        env,
    )
    .with_retry(retry_policy(config));

    let mut orchestrator = orchestrator(config, &services)?;
    let mut ctx = ReleaseContext::new();
    let report = orchestrator.run(&mut ctx, target).await?;

    if mode.dry_run {
        println!("Dry run, nothing was changed:");
        print!("{}", services.log().render());
        println!();
    }
    println!("{report}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct Harness {
        #[command(flatten)]
        args: ReleaseArgs,
    }

    fn parse(argv: &[&str]) -> ReleaseArgs {
        let mut full = vec!["release"];
        full.extend_from_slice(argv);
        Harness::try_parse_from(full).unwrap().args
    }

    #[test]
    fn test_defaults_to_patch() {
        let target = parse(&[]).version_target().unwrap();
        assert_eq!(target, VersionTarget::Increment(Increment::Patch));
    }

    #[test]
    fn test_explicit_version() {
        let target = parse(&["v2.0.0-rc.1"]).version_target().unwrap();
        assert_eq!(
            target,
            VersionTarget::Exact(Version::parse("2.0.0-rc.1").unwrap())
        );
    }

    #[test]
    fn test_invalid_explicit_version() {
        let err = parse(&["next"]).version_target().unwrap_err();
        assert!(err.to_string().contains("invalid version \"next\""));
    }

    #[test]
    fn test_preid_implies_prerelease() {
        let target = parse(&["--preid", "beta"]).version_target().unwrap();
        assert_eq!(
            target,
            VersionTarget::Increment(Increment::PreRelease(Some("beta".to_string())))
        );
    }

    #[test]
    fn test_preid_rejected_for_major() {
        let args = parse(&["--increment", "major", "--preid", "beta"]);
        assert!(args.version_target().is_err());
    }

    #[test]
    fn test_version_conflicts_with_increment() {
        let result = Harness::try_parse_from(["release", "1.0.0", "--increment", "minor"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_retry_policy_from_config() {
        let mut config = Config::default();
        config.retry.max_attempts = 5;
        assert_eq!(retry_policy(&config).max_attempts(), 5);
    }
}
