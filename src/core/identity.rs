//! Stable repository identity.
//!
//! The id of a tracked directory is derived from the Git repository enclosing it:
//! `<project>/<path inside the checkout>`. The same checkout on two machines maps to
//! the same id as long as the paths inside the checkout agree. Directories outside
//! any Git checkout, or checkouts without a parseable remote, get a random id.

use crate::core::remote::RemoteIdentity;
use git2::Repository;
use std::path::{Path, PathBuf};

/// Remote consulted first when a checkout has several
const PREFERRED_REMOTE: &str = "origin";

/// Resolve the id for `path`. `existing_ids` is accepted for callers that track
/// taken ids but random fallbacks are not checked against it.
pub fn get_repo_id(path: &Path, _existing_ids: &[String]) -> String {
    match vcs_repo_id(path) {
        Some(id) => id,
        None => {
            let id = uuid::Uuid::new_v4().to_string();
            log::debug!("No VCS identity for {}, using random id {id}", path.display());
            id
        }
    }
}

/// Id derived from the enclosing checkout, if any
pub fn vcs_repo_id(path: &Path) -> Option<String> {
    let repo = Repository::discover(path).ok()?;
    let workdir = repo.workdir()?;
    let url = configured_remote_url(&repo)?;
    let identity = match RemoteIdentity::parse(&url) {
        Ok(identity) => identity,
        Err(e) => {
            log::debug!("Ignoring remote of {}: {e}", workdir.display());
            return None;
        }
    };

    let relative = relative_path(workdir, path)?;
    if relative.is_empty() {
        Some(identity.project)
    } else {
        Some(format!("{}/{}", identity.project, relative))
    }
}

/// URL of `origin`, falling back to the first remote with a URL
pub fn configured_remote_url(repo: &Repository) -> Option<String> {
    if let Ok(remote) = repo.find_remote(PREFERRED_REMOTE) {
        if let Some(url) = remote.url() {
            return Some(url.to_string());
        }
    }

    let names = repo.remotes().ok()?;
    names
        .iter()
        .flatten()
        .filter_map(|name| repo.find_remote(name).ok())
        .find_map(|remote| remote.url().map(str::to_string))
}

/// `path` relative to `root`, `/`-separated
fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let root = canonical(root);
    let path = canonical(path);
    let relative = path.strip_prefix(&root).ok()?;
    Some(
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
    )
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use tempfile::TempDir;

    fn git(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .expect("git must be installed");
        assert!(status.status.success(), "git {:?} failed", args);
    }

    #[test]
    fn test_id_composed_from_remote_and_subpath() {
        let dir = TempDir::new().unwrap();
        git(dir.path(), &["init"]);
        git(
            dir.path(),
            &["remote", "add", "origin", "https://host/owner/project.git"],
        );
        let sub = dir.path().join("sub").join("dir");
        std::fs::create_dir_all(&sub).unwrap();

        let first = get_repo_id(&sub, &[]);
        let second = get_repo_id(&sub, &[first.clone()]);
        assert_eq!(first, "project/sub/dir");
        assert_eq!(first, second);
    }

    #[test]
    fn test_repo_root_maps_to_project() {
        let dir = TempDir::new().unwrap();
        git(dir.path(), &["init"]);
        git(
            dir.path(),
            &["remote", "add", "upstream", "git@host:owner/tool.git"],
        );
        assert_eq!(get_repo_id(dir.path(), &[]), "tool");
    }

    #[test]
    fn test_checkout_without_remote_gets_random_id() {
        let dir = TempDir::new().unwrap();
        git(dir.path(), &["init"]);
        assert!(vcs_repo_id(dir.path()).is_none());
    }

    #[test]
    fn test_non_vcs_paths_get_distinct_ids() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        let id_a = get_repo_id(a.path(), &[]);
        let id_b = get_repo_id(b.path(), &[]);
        assert_ne!(id_a, id_b);
    }
}
