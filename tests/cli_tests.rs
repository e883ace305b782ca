use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;
use tempfile::TempDir;

mod common;
use common::{fixtures::*, repository::*};

/// Binary invocation with its config directory inside `config`
fn source_bridge(config: &TempDir) -> anyhow::Result<Command> {
    let mut cmd = Command::cargo_bin("source-bridge")?;
    cmd.env("XDG_CONFIG_HOME", config.path())
        .env_remove("RUST_LOG");
    Ok(cmd)
}

#[cfg(test)]
mod cli_tests {
    use super::*;

    #[test]
    fn test_list_when_empty() -> anyhow::Result<()> {
        let config = TempDir::new()?;
        source_bridge(&config)?
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("No repositories tracked"));
        Ok(())
    }

    #[test]
    fn test_add_list_rename_remove() -> anyhow::Result<()> {
        let config = TempDir::new()?;
        let project = TempDir::new()?;

        source_bridge(&config)?
            .args(["add", "--id", "demo", "--name", "Demo"])
            .arg(project.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("Tracking repository as demo"));

        source_bridge(&config)?
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("[demo] Demo"));

        source_bridge(&config)?
            .args(["rename", "DEMO", "Renamed"])
            .assert()
            .success();

        source_bridge(&config)?
            .args(["list", "--json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"repoName\": \"Renamed\""));

        source_bridge(&config)?
            .args(["remove", "demo"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Removed demo"));

        source_bridge(&config)?
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("No repositories tracked"));
        Ok(())
    }

    #[test]
    fn test_unknown_repository_fails() -> anyhow::Result<()> {
        let config = TempDir::new()?;
        source_bridge(&config)?
            .args(["remove", "nope"])
            .assert()
            .failure()
            .stdout(predicate::str::contains("Repository not found: nope"));
        Ok(())
    }

    #[test]
    fn test_read_refuses_traversal() -> anyhow::Result<()> {
        let config = TempDir::new()?;
        let project = TempDir::new()?;
        create_file(project.path(), "src/index.ts", "export {};\n")?;

        source_bridge(&config)?
            .args(["add", "--id", "demo"])
            .arg(project.path())
            .assert()
            .success();

        source_bridge(&config)?
            .args(["read", "demo", "src/index.ts"])
            .assert()
            .success()
            .stdout(predicate::str::contains("export {};"));

        source_bridge(&config)?
            .args(["read", "demo", "../../etc/passwd"])
            .assert()
            .failure()
            .stdout(predicate::str::contains("Path escapes repository root"));
        Ok(())
    }

    #[test]
    fn test_allow_index_reports_file_count() -> anyhow::Result<()> {
        let config = TempDir::new()?;
        let project = TempDir::new()?;
        create_file(project.path(), "a.rs", "")?;
        create_file(project.path(), "b.rs", "")?;

        source_bridge(&config)?
            .args(["add", "--id", "demo"])
            .arg(project.path())
            .assert()
            .success();

        source_bridge(&config)?
            .args(["allow-index", "on"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Indexed 2 files in demo"));

        source_bridge(&config)?
            .args(["list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("indexed, 2 files"));
        Ok(())
    }

    #[test]
    fn test_origin_checks_without_network() -> anyhow::Result<()> {
        let config = TempDir::new()?;
        source_bridge(&config)?
            .args(["check-origin", "http://localhost:44512"])
            .assert()
            .success();

        source_bridge(&config)?
            .args(["check-origin", "https://evil.example.com"])
            .assert()
            .failure()
            .stdout(predicate::str::contains("Origin not allowed"));
        Ok(())
    }

    #[test]
    fn test_sync_git_tracks_mirror() -> anyhow::Result<()> {
        let config = TempDir::new()?;
        let (remote, _) = create_widgets_remote()?;

        source_bridge(&config)?
            .args(["sync-git", &remote.url(), "main", "--track"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Tracking mirror as widgets"));

        let mirror = config.path().join("source-bridge/git-mirrors/widgets");
        assert!(mirror.join("README.md").exists());
        Ok(())
    }

    #[test]
    fn test_p4_views_with_missing_binary_fails() -> anyhow::Result<()> {
        let config = TempDir::new()?;
        source_bridge(&config)?
            .args(["p4-views", "depot"])
            .env("PATH", config.path())
            .assert()
            .failure();
        Ok(())
    }
}
