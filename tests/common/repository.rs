//! Git repository setup utilities
//!
//! Provides functions for creating throwaway repositories, committing to them
//! and pointing them at remotes.

#![allow(dead_code)]

use anyhow::{bail, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// A repository inside a temporary directory. The TempDir must be kept alive for
/// the duration of the test to prevent cleanup.
pub struct TestRepo {
    pub temp_dir: TempDir,
    pub path: PathBuf,
}

impl TestRepo {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `file://` URL other repositories can fetch from
    pub fn url(&self) -> String {
        format!("file://{}", self.path.display())
    }
}

/// Run git in `dir`, failing the test on a non-zero exit
pub fn git(dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git").args(args).current_dir(dir).output()?;
    if !output.status.success() {
        bail!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Initialise a repository at `path` on branch `main` with a test identity
pub fn init_repo_at(path: &Path) -> Result<()> {
    fs::create_dir_all(path)?;
    git(path, &["init"])?;
    git(path, &["symbolic-ref", "HEAD", "refs/heads/main"])?;
    git(path, &["config", "user.name", "Test User"])?;
    git(path, &["config", "user.email", "test@example.com"])?;
    git(path, &["config", "commit.gpgsign", "false"])?;
    Ok(())
}

/// Sets up a fresh repository at `<tmp>/<owner>/<project>`, so that its
/// `file://` URL has a meaningful identity
pub fn setup_named_repo(owner: &str, project: &str) -> Result<TestRepo> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join(owner).join(project);
    init_repo_at(&path)?;
    Ok(TestRepo { temp_dir, path })
}

pub fn setup_test_repo() -> Result<TestRepo> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().to_path_buf();
    init_repo_at(&path)?;
    Ok(TestRepo { temp_dir, path })
}

/// Write `content` to `filename`, creating parent directories
pub fn create_file(repo_path: &Path, filename: &str, content: &str) -> Result<()> {
    let path = repo_path.join(filename);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

/// Stage everything and commit, returning the new commit id
pub fn commit_all(repo_path: &Path, message: &str) -> Result<String> {
    git(repo_path, &["add", "-A"])?;
    git(repo_path, &["commit", "-m", message])?;
    git(repo_path, &["rev-parse", "HEAD"])
}

pub fn set_origin(repo_path: &Path, url: &str) -> Result<()> {
    git(repo_path, &["remote", "add", "origin", url])?;
    Ok(())
}

pub fn head_of(repo_path: &Path) -> Result<String> {
    git(repo_path, &["rev-parse", "HEAD"])
}
