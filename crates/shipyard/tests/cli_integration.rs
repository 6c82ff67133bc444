//! End-to-end CLI integration tests.
//!
//! These tests run the `shipyard` binary against temporary directories and
//! git repositories. Every release here runs with `--dry-run --ci`.

use std::fs;
use std::path::Path;
use std::process::Command as StdCommand;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn shipyard(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("shipyard").expect("binary should build");
    cmd.current_dir(dir).env_remove("RUST_LOG");
    cmd
}

fn git(dir: &Path, args: &[&str]) -> String {
    let output = StdCommand::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run git");
    assert!(output.status.success(), "git {args:?} failed");
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Creates a repository with one commit tagged `v1.2.0`.
fn setup_git_repo() -> TempDir {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let dir = temp_dir.path();

    git(dir, &["init"]);
    git(dir, &["config", "user.email", "test@example.com"]);
    git(dir, &["config", "user.name", "Test User"]);
    fs::write(dir.join("README.md"), "# demo\n").unwrap();
    git(dir, &["add", "README.md"]);
    git(dir, &["commit", "-m", "Initial commit"]);
    git(dir, &["tag", "v1.2.0"]);

    temp_dir
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    shipyard(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("release"));
}

#[test]
fn test_init_creates_config() {
    let dir = TempDir::new().unwrap();
    shipyard(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created shipyard.toml"));

    let content = fs::read_to_string(dir.path().join("shipyard.toml")).unwrap();
    assert!(content.contains("[npm]"));
    assert!(content.contains("[github]"));
}

#[test]
fn test_init_refuses_overwrite_without_force() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("shipyard.toml"), "# mine\n").unwrap();

    shipyard(dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
    assert_eq!(
        fs::read_to_string(dir.path().join("shipyard.toml")).unwrap(),
        "# mine\n"
    );

    shipyard(dir.path()).args(["init", "--force"]).assert().success();
    let content = fs::read_to_string(dir.path().join("shipyard.toml")).unwrap();
    assert!(content.contains("[git]"));
}

#[test]
fn test_release_without_targets_fails() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("shipyard.toml"),
        "[npm]\nenabled = false\n\n[git]\nenabled = false\n",
    )
    .unwrap();

    shipyard(dir.path())
        .args(["release", "--dry-run", "--ci"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no release targets enabled"));
}

#[test]
fn test_release_rejects_unknown_increment() {
    let dir = TempDir::new().unwrap();
    shipyard(dir.path())
        .args(["release", "--increment", "huge"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value 'huge'"));
}

#[test]
fn test_release_rejects_invalid_config() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("shipyard.toml"), "[retry]\nmax_attempts = 0\n").unwrap();

    shipyard(dir.path())
        .args(["release", "--dry-run", "--ci"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("retry.max_attempts must be at least 1"));
}

#[test]
fn test_git_release_dry_run_changes_nothing() {
    let repo = setup_git_repo();
    let dir = repo.path();
    fs::write(
        dir.join("shipyard.toml"),
        "[npm]\nenabled = false\n\n[git]\nrequire_upstream = false\n",
    )
    .unwrap();

    shipyard(dir)
        .args(["release", "--dry-run", "--ci"])
        .assert()
        .success()
        .stdout(predicate::str::contains("$ git describe --tags --abbrev=0"))
        .stdout(predicate::str::contains(
            "! git commit --message \"Release 1.2.1\"",
        ))
        .stdout(predicate::str::contains(
            "! git tag --annotate --message \"Release 1.2.1\" v1.2.1",
        ))
        .stdout(predicate::str::contains("Released 1.2.1 (v1.2.1)"));

    assert_eq!(git(dir, &["tag", "--list"]).trim(), "v1.2.0");
    assert_eq!(git(dir, &["rev-list", "--count", "HEAD"]).trim(), "1");
}

#[test]
fn test_git_release_refuses_dirty_working_dir() {
    let repo = setup_git_repo();
    let dir = repo.path();
    fs::write(dir.join("shipyard.toml"), "[npm]\nenabled = false\n").unwrap();
    fs::write(dir.join("README.md"), "# changed\n").unwrap();

    shipyard(dir)
        .args(["release", "--dry-run", "--ci"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Working dir must be clean"));
}

#[test]
fn test_explicit_version_skips_increment() {
    let repo = setup_git_repo();
    let dir = repo.path();
    fs::write(
        dir.join("shipyard.toml"),
        "[npm]\nenabled = false\n\n[git]\nrequire_upstream = false\npush = false\n",
    )
    .unwrap();

    shipyard(dir)
        .args(["release", "3.0.0-rc.1", "--dry-run", "--ci"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Released 3.0.0-rc.1 (v3.0.0-rc.1)"))
        .stdout(predicate::str::contains("git push").not());
}
