//! Managed Git mirrors.
//!
//! A mirror is a shallow, single-ref checkout of a remote repository stored under
//! the mirror root, one directory per project. Mirrors are found by remote identity
//! (host, owner, project) so https, ssh and token-bearing URLs for the same project
//! share one mirror.
//!
//! # Public API
//! - [`GitSyncManager::sync_git_repository`]: locate-or-clone, then bring the mirror to a ref
//! - [`GitSyncManager::locate`], [`GitSyncManager::clone_mirror`], [`GitSyncManager::sync`]
//!
//! Clones of one remote identity run one at a time; different identities clone in
//! parallel. A fetch that is still transferring after five minutes is cancelled.
//! - [`GitSyncManager::test_connection`]: list remote refs without cloning
//!
//! Mirrors are managed storage: syncing force-checks-out the ref and discards any
//! local modification. Failures propagate to the caller; nothing is retried here.

use crate::core::config::BitbucketSettings;
use crate::core::error::{Result, SourceBridgeError};
use crate::core::remote::{host_of, is_local_url, RemoteIdentity};
use git2::build::CheckoutBuilder;
use git2::{
    AutotagOption, Cred, CredentialType, Direction, FetchOptions, Oid, RemoteCallbacks, Repository,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

const MIRROR_REMOTE: &str = "origin";

/// A fetch still transferring after this long is cancelled
const FETCH_TIMEOUT: Duration = Duration::from_secs(300);

/// Username sent with Bitbucket HTTP access tokens
const BITBUCKET_TOKEN_USER: &str = "x-token-auth";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitCredentials {
    pub username: String,
    pub token: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitSyncRequest {
    #[serde(default)]
    pub is_git: bool,
    /// Returned unchanged for requests that are not git-backed
    #[serde(default)]
    pub path: PathBuf,
    #[serde(default)]
    pub remote_url: String,
    #[serde(default)]
    pub git_ref: String,
    #[serde(default)]
    pub credentials: Option<GitCredentials>,
}

#[derive(Default)]
struct MirrorTable {
    scanned: bool,
    entries: HashMap<String, PathBuf>,
}

pub struct GitSyncManager {
    mirror_root: PathBuf,
    bitbucket: Option<BitbucketSettings>,
    /// Held only for scans, lookups and inserts, never across network IO
    table: tokio::sync::Mutex<MirrorTable>,
    /// Serializes locate-or-clone per remote identity
    identity_locks: parking_lot::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    mirror_locks: parking_lot::Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl GitSyncManager {
    pub fn new(mirror_root: impl Into<PathBuf>, bitbucket: Option<BitbucketSettings>) -> Self {
        Self {
            mirror_root: mirror_root.into(),
            bitbucket,
            table: tokio::sync::Mutex::new(MirrorTable::default()),
            identity_locks: parking_lot::Mutex::new(HashMap::new()),
            mirror_locks: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    pub fn mirror_root(&self) -> &Path {
        &self.mirror_root
    }

    /// Bring the mirror for `request.remote_url` to `request.git_ref` and return its
    /// directory. Requests that are not git-backed return `request.path` untouched.
    pub async fn sync_git_repository(&self, request: GitSyncRequest) -> Result<PathBuf> {
        if !request.is_git {
            return Ok(request.path);
        }

        let identity = RemoteIdentity::parse(&request.remote_url)?;
        let credentials = self.credentials_for(&identity, &request)?;

        let (dir, cloned) = self
            .locate_or_clone(
                &request.remote_url,
                &identity,
                &request.git_ref,
                credentials.clone(),
            )
            .await?;
        if !cloned {
            self.sync(&dir, &request.git_ref, credentials).await?;
        }
        Ok(dir)
    }

    /// Find the mirror of `remote_url`'s project, if one exists
    pub async fn locate(&self, remote_url: &str) -> Result<Option<PathBuf>> {
        let identity = RemoteIdentity::parse(remote_url)?;
        let mut table = self.table.lock().await;
        self.ensure_scanned(&mut table).await?;
        Ok(lookup(&mut table, &identity))
    }

    /// Create a mirror of `remote_url` checked out at `git_ref`. A project that is
    /// already mirrored is synced in place instead of cloned a second time.
    pub async fn clone_mirror(
        &self,
        remote_url: &str,
        git_ref: &str,
        credentials: Option<GitCredentials>,
    ) -> Result<PathBuf> {
        let identity = RemoteIdentity::parse(remote_url)?;
        let (dir, cloned) = self
            .locate_or_clone(remote_url, &identity, git_ref, credentials.clone())
            .await?;
        if !cloned {
            self.sync(&dir, git_ref, credentials).await?;
        }
        Ok(dir)
    }

    /// Shallow-fetch `git_ref` into an existing mirror and force it checked out
    pub async fn sync(
        &self,
        mirror_dir: &Path,
        git_ref: &str,
        credentials: Option<GitCredentials>,
    ) -> Result<()> {
        let lock = self.mirror_lock(mirror_dir);
        let _guard = lock.lock().await;

        let dir = mirror_dir.to_path_buf();
        let git_ref = git_ref.to_string();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let repo = Repository::open(&dir)?;
            let oid = fetch_and_checkout(&repo, &git_ref, credentials.as_ref())?;
            log::info!("Synced mirror {} to {git_ref} ({oid})", dir.display());
            Ok(())
        })
        .await?
    }

    /// Connect to `remote_url` and count its refs
    pub async fn test_connection(
        &self,
        remote_url: &str,
        credentials: Option<GitCredentials>,
    ) -> Result<usize> {
        let identity = RemoteIdentity::parse(remote_url)?;
        let request = GitSyncRequest {
            remote_url: remote_url.to_string(),
            credentials,
            ..GitSyncRequest::default()
        };
        let credentials = self.credentials_for(&identity, &request)?;

        let url = remote_url.to_string();
        tokio::task::spawn_blocking(move || -> Result<usize> {
            let mut remote = git2::Remote::create_detached(url.as_str())?;
            let connection =
                remote.connect_auth(Direction::Fetch, Some(callbacks(credentials.as_ref())), None)?;
            let refs = connection.list()?.len();
            log::debug!("{url} advertises {refs} refs");
            Ok(refs)
        })
        .await?
    }

    /// Explicit credentials win; remotes on the configured Bitbucket server fall back
    /// to its token and must belong to an allowed project.
    fn credentials_for(
        &self,
        identity: &RemoteIdentity,
        request: &GitSyncRequest,
    ) -> Result<Option<GitCredentials>> {
        let Some(bitbucket) = &self.bitbucket else {
            return Ok(request.credentials.clone());
        };
        if host_of(&bitbucket.url).as_deref() != Some(identity.host.as_str()) {
            return Ok(request.credentials.clone());
        }

        if !bitbucket.projects.is_empty()
            && !bitbucket
                .projects
                .iter()
                .any(|project| project.eq_ignore_ascii_case(&identity.owner))
        {
            return Err(SourceBridgeError::remote_not_allowed(&request.remote_url));
        }

        if request.credentials.is_some() || bitbucket.token.is_empty() {
            return Ok(request.credentials.clone());
        }
        Ok(Some(GitCredentials {
            username: BITBUCKET_TOKEN_USER.to_string(),
            token: bitbucket.token.clone(),
        }))
    }

    /// Returns the mirror directory and whether it was cloned by this call
    async fn locate_or_clone(
        &self,
        remote_url: &str,
        identity: &RemoteIdentity,
        git_ref: &str,
        credentials: Option<GitCredentials>,
    ) -> Result<(PathBuf, bool)> {
        let lock = self.identity_lock(&identity.key());
        let _guard = lock.lock().await;

        let dir = {
            let mut table = self.table.lock().await;
            self.ensure_scanned(&mut table).await?;
            if let Some(dir) = lookup(&mut table, identity) {
                return Ok((dir, false));
            }
            // reserve the directory so a concurrent clone of a same-named project
            // picks another one
            let dir = self.free_mirror_dir(identity);
            tokio::fs::create_dir_all(&dir).await?;
            dir
        };

        self.clone_new(remote_url, identity, &dir, git_ref, credentials).await?;
        self.table
            .lock()
            .await
            .entries
            .insert(identity.key(), dir.clone());
        Ok((dir, true))
    }

    async fn ensure_scanned(&self, table: &mut MirrorTable) -> Result<()> {
        if table.scanned {
            return Ok(());
        }
        let root = self.mirror_root.clone();
        table.entries = tokio::task::spawn_blocking(move || scan_mirrors(&root)).await??;
        table.scanned = true;
        Ok(())
    }

    async fn clone_new(
        &self,
        remote_url: &str,
        identity: &RemoteIdentity,
        dir: &Path,
        git_ref: &str,
        credentials: Option<GitCredentials>,
    ) -> Result<()> {
        let url = remote_url.to_string();
        let git_ref = git_ref.to_string();

        log::info!("Cloning {identity} at {git_ref} into {}", dir.display());
        let target = dir.to_path_buf();
        let cloned = tokio::task::spawn_blocking(move || -> Result<()> {
            let repo = Repository::init(&target)?;
            repo.remote(MIRROR_REMOTE, &url)?;
            fetch_and_checkout(&repo, &git_ref, credentials.as_ref())?;
            Ok(())
        })
        .await?;

        if let Err(e) = cloned {
            if let Err(cleanup) = tokio::fs::remove_dir_all(dir).await {
                log::warn!(
                    "Failed to remove partial mirror {}: {cleanup}",
                    dir.display()
                );
            }
            return Err(e);
        }
        Ok(())
    }

    /// `<root>/<project>`, or `<root>/<project>-<hash>` when another project took the name
    fn free_mirror_dir(&self, identity: &RemoteIdentity) -> PathBuf {
        let plain = self.mirror_root.join(&identity.project);
        if !plain.exists() {
            return plain;
        }
        let digest = format!("{:x}", md5::compute(identity.key()));
        self.mirror_root
            .join(format!("{}-{}", identity.project, &digest[..8]))
    }

    fn identity_lock(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.identity_locks.lock();
        Arc::clone(locks.entry(key.to_string()).or_default())
    }

    fn mirror_lock(&self, dir: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.mirror_locks.lock();
        Arc::clone(locks.entry(dir.to_path_buf()).or_default())
    }
}

fn lookup(table: &mut MirrorTable, identity: &RemoteIdentity) -> Option<PathBuf> {
    let key = identity.key();
    let dir = table.entries.get(&key)?.clone();
    if dir.join(".git").exists() {
        return Some(dir);
    }
    log::warn!("Mirror {} disappeared, forgetting it", dir.display());
    table.entries.remove(&key);
    None
}

/// Map every remote of every repository under `root` to its directory
fn scan_mirrors(root: &Path) -> Result<HashMap<String, PathBuf>> {
    let mut entries = HashMap::new();
    if !root.exists() {
        return Ok(entries);
    }

    for entry in std::fs::read_dir(root)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let Ok(repo) = Repository::discover(&path) else {
            continue;
        };
        let Some(workdir) = repo.workdir().map(Path::to_path_buf) else {
            continue;
        };

        let names = repo.remotes()?;
        for name in names.iter().flatten() {
            let Some(url) = repo
                .find_remote(name)
                .ok()
                .and_then(|r| r.url().map(str::to_string))
            else {
                continue;
            };
            let Ok(identity) = RemoteIdentity::parse(&url) else {
                continue;
            };
            if let Some(previous) = entries.get(&identity.key()) {
                log::warn!(
                    "{identity} mirrored twice ({} and {}), keeping the first",
                    previous.display(),
                    workdir.display()
                );
                continue;
            }
            entries.insert(identity.key(), workdir.clone());
        }
    }

    log::debug!("Found {} mirrors under {}", entries.len(), root.display());
    Ok(entries)
}

fn fetch_and_checkout(
    repo: &Repository,
    git_ref: &str,
    credentials: Option<&GitCredentials>,
) -> Result<Oid> {
    let mut remote = repo.find_remote(MIRROR_REMOTE)?;
    let url = remote.url().unwrap_or_default().to_string();

    let deadline = Instant::now() + FETCH_TIMEOUT;
    let mut remote_callbacks = callbacks(credentials);
    remote_callbacks.transfer_progress(move |_| Instant::now() < deadline);

    let mut fetch_options = FetchOptions::new();
    fetch_options.remote_callbacks(remote_callbacks);
    fetch_options.download_tags(AutotagOption::None);
    // The local transport does not support shallow fetches
    fetch_options.depth(if is_local_url(&url) { 0 } else { 1 });

    if let Err(e) = remote.fetch(&[git_ref], Some(&mut fetch_options), None) {
        if Instant::now() >= deadline {
            return Err(SourceBridgeError::git_timeout(url, FETCH_TIMEOUT.as_secs()));
        }
        return Err(e.into());
    }

    let mut fetched = None;
    repo.fetchhead_foreach(|_, _, oid, _| {
        fetched.get_or_insert(*oid);
        true
    })?;
    let oid = fetched.ok_or_else(|| {
        git2::Error::from_str(&format!("ref '{git_ref}' not found on {url}"))
    })?;

    let commit = repo.find_commit(oid).or_else(|_| {
        repo.find_object(oid, None)
            .and_then(|object| object.peel_to_commit())
    })?;

    let mut checkout = CheckoutBuilder::new();
    checkout.force().remove_untracked(true);
    repo.checkout_tree(commit.as_object(), Some(&mut checkout))?;
    repo.set_head_detached(commit.id())?;
    Ok(commit.id())
}

fn callbacks(credentials: Option<&GitCredentials>) -> RemoteCallbacks<'static> {
    let mut callbacks = RemoteCallbacks::new();
    let Some(credentials) = credentials.cloned() else {
        return callbacks;
    };

    let mut attempts = 0;
    callbacks.credentials(move |_url, username_from_url, allowed| {
        attempts += 1;
        // libgit2 keeps asking while the server rejects what we sent
        if attempts > 1 {
            return Err(git2::Error::from_str("authentication failed"));
        }
        if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
            Cred::userpass_plaintext(&credentials.username, &credentials.token)
        } else if allowed.contains(CredentialType::SSH_KEY) {
            Cred::ssh_key_from_agent(username_from_url.unwrap_or("git"))
        } else {
            Cred::default()
        }
    });
    callbacks
}
