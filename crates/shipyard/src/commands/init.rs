//! Initialize command.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Args;
use shipyard_config::CONFIG_FILE_NAME;

/// Arguments for the init command.
#[derive(Debug, Args)]
pub struct InitArgs {
    /// Force overwrite existing configuration
    #[arg(short, long)]
    pub force: bool,
}

const DEFAULT_CONFIG: &str = r#"# Shipyard release configuration.

[version]
tag_prefix = "v"

[retry]
max_attempts = 3
min_timeout_ms = 1000
factor = 2
max_timeout_ms = 30000

[npm]
enabled = true
publish = true
# tag = "beta"
# otp = "123456"
skip_checks = false
timeout_secs = 10

[git]
enabled = true
require_clean_working_dir = true
require_upstream = true
commit = true
commit_message = "Release {version}"
tag = true
tag_annotation = "Release {version}"
push = true
# push_remote = "origin"

[github]
release = false
token_ref = "GITHUB_TOKEN"
release_name = "Release {version}"
draft = false
assets = []
"#;

/// Runs the init command.
pub fn run(args: &InitArgs) -> Result<()> {
    write_config(Path::new(CONFIG_FILE_NAME), args.force)?;
    println!("Created {CONFIG_FILE_NAME}");
    Ok(())
}

fn write_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write {}", path.display()))
}
