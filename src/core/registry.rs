//! The authoritative set of tracked repositories.
//!
//! [`RepoRegistry`] owns one [`Indexer`] per tracked directory and persists the
//! list through the [`JsonStore`] after every mutation. Mutations and their
//! persistence run one at a time behind an async writer lock, so two concurrent
//! `add` calls can never lose each other's record. Reads take a short synchronous
//! lock and never wait on a writer that is resolving an identity. A mutation whose
//! persistence fails is rolled back, so memory never drifts from the store.

use crate::core::config::{KEY_ALLOW_INDEX, KEY_REPOSITORIES};
use crate::core::error::{Result, SourceBridgeError};
use crate::core::identity;
use crate::core::indexer::{DiagnosticSink, IndexOptions, IndexStatus, Indexer, LogSink};
use crate::core::state::{NewRepository, RepositoryRecord, StoredRepository};
use crate::core::store::JsonStore;
use parking_lot::RwLock;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// What `add` does with a path that does not exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddMode {
    /// Log and track it anyway, e.g. a drive that is not mounted yet
    #[default]
    Lenient,
    /// Refuse with `PathNotFound`
    Strict,
}

#[derive(Clone)]
pub struct RegistryOptions {
    pub add_mode: AddMode,
    pub index: IndexOptions,
    pub sink: Arc<dyn DiagnosticSink>,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            add_mode: AddMode::default(),
            index: IndexOptions::default(),
            sink: Arc::new(LogSink),
        }
    }
}

#[derive(Clone)]
struct TrackedRepo {
    stored: StoredRepository,
    indexer: Arc<Indexer>,
}

impl TrackedRepo {
    fn record(&self) -> RepositoryRecord {
        RepositoryRecord::from_parts(&self.stored, self.indexer.snapshot())
    }
}

pub struct RepoRegistry {
    store: Arc<JsonStore>,
    repos: RwLock<Vec<TrackedRepo>>,
    writer: tokio::sync::Mutex<()>,
    allow_index: AtomicBool,
    options: RegistryOptions,
}

impl RepoRegistry {
    /// Restore the persisted list. When indexing is allowed every restored
    /// repository starts indexing, so this must run inside a tokio runtime.
    pub fn load(store: Arc<JsonStore>, options: RegistryOptions) -> Result<Self> {
        let stored: Vec<StoredRepository> = store.get(KEY_REPOSITORIES)?.unwrap_or_default();
        let allow_index = store.get_or(KEY_ALLOW_INDEX, false);

        let repos: Vec<TrackedRepo> = stored
            .into_iter()
            .map(|stored| {
                let indexer = Indexer::new(
                    stored.fullpath.clone(),
                    options.index.clone(),
                    Arc::clone(&options.sink),
                );
                TrackedRepo { stored, indexer }
            })
            .collect();

        log::info!("Loaded {} repositories", repos.len());

        if allow_index {
            for repo in &repos {
                repo.indexer.index();
            }
        }

        Ok(Self {
            store,
            repos: RwLock::new(repos),
            writer: tokio::sync::Mutex::new(()),
            allow_index: AtomicBool::new(allow_index),
            options,
        })
    }

    pub fn allow_index(&self) -> bool {
        self.allow_index.load(Ordering::SeqCst)
    }

    /// Track a directory and return its id. Adding a path that is already tracked
    /// returns the existing id.
    pub async fn add(&self, new: NewRepository) -> Result<String> {
        let _writer = self.writer.lock().await;

        if let Some(existing) = self.id_for_path(&new.fullpath) {
            log::debug!(
                "{} already tracked as {existing}",
                new.fullpath.display()
            );
            return Ok(existing);
        }

        if !new.fullpath.exists() {
            match self.options.add_mode {
                AddMode::Strict => return Err(SourceBridgeError::path_not_found(&new.fullpath)),
                AddMode::Lenient => log::warn!(
                    "Adding repository at missing path {}",
                    new.fullpath.display()
                ),
            }
        }

        let id = match new.id.filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => {
                let existing = self.ids();
                let path = new.fullpath.clone();
                tokio::task::spawn_blocking(move || identity::get_repo_id(&path, &existing))
                    .await?
            }
        };

        let repo_name = if new.repo_name.is_empty() {
            default_name(&new.fullpath)
        } else {
            new.repo_name
        };

        let indexer = Indexer::new(
            new.fullpath.clone(),
            self.options.index.clone(),
            Arc::clone(&self.options.sink),
        );

        let stored = StoredRepository {
            id: id.clone(),
            repo_name,
            fullpath: new.fullpath,
        };
        log::info!("Tracking {} as {id}", stored.fullpath.display());

        let snapshot = {
            let mut repos = self.repos.write();
            repos.push(TrackedRepo {
                stored,
                indexer: Arc::clone(&indexer),
            });
            stored_list(&repos)
        };
        if let Err(e) = self.persist(&snapshot) {
            self.repos
                .write()
                .retain(|repo| !Arc::ptr_eq(&repo.indexer, &indexer));
            return Err(e);
        }

        if self.allow_index() {
            indexer.index();
        }
        Ok(id)
    }

    /// Stop tracking every record with `id`. Returns whether anything was removed.
    pub async fn remove(&self, id: &str) -> Result<bool> {
        let _writer = self.writer.lock().await;
        self.remove_where(|stored| stored.id == id)
    }

    /// Stop tracking every record located inside `root`
    pub async fn remove_under(&self, root: &Path) -> Result<usize> {
        let _writer = self.writer.lock().await;
        let before = self.repos.read().len();
        self.remove_where(|stored| stored.fullpath.starts_with(root))?;
        Ok(before - self.repos.read().len())
    }

    /// Rename a repository. Empty names and unknown ids are ignored.
    pub async fn update(&self, id: &str, repo_name: &str) -> Result<bool> {
        if repo_name.is_empty() {
            return Ok(false);
        }

        let _writer = self.writer.lock().await;
        let (previous, snapshot) = {
            let mut repos = self.repos.write();
            let Some(repo) = repos.iter_mut().find(|repo| repo.stored.id == id) else {
                return Ok(false);
            };
            let previous = std::mem::replace(&mut repo.stored.repo_name, repo_name.to_string());
            (previous, stored_list(&repos))
        };
        if let Err(e) = self.persist(&snapshot) {
            if let Some(repo) = self.repos.write().iter_mut().find(|repo| repo.stored.id == id) {
                repo.stored.repo_name = previous;
            }
            return Err(e);
        }
        Ok(true)
    }

    /// Toggle indexing for every repository
    pub async fn set_allow_index(&self, enable: bool) -> Result<()> {
        let _writer = self.writer.lock().await;
        self.store.set(KEY_ALLOW_INDEX, &enable)?;
        self.allow_index.store(enable, Ordering::SeqCst);

        for indexer in self.indexers() {
            if enable {
                indexer.index();
            } else {
                indexer.delete_index();
            }
        }
        Ok(())
    }

    pub fn re_index(&self, id: &str) -> Result<()> {
        let indexer = self
            .indexer(id)
            .ok_or_else(|| SourceBridgeError::repository_not_found(id))?;
        indexer.re_index();
        Ok(())
    }

    /// Wait for the current walk of `id` to finish
    pub async fn wait_for_index(&self, id: &str) -> Result<IndexStatus> {
        let indexer = self
            .indexer(id)
            .ok_or_else(|| SourceBridgeError::repository_not_found(id))?;
        Ok(indexer.wait_until_settled().await)
    }

    pub fn get_repositories(&self) -> Vec<RepositoryRecord> {
        self.repos.read().iter().map(TrackedRepo::record).collect()
    }

    pub fn get_repo_by_id(&self, id: &str) -> Option<RepositoryRecord> {
        self.repos
            .read()
            .iter()
            .find(|repo| repo.stored.id == id)
            .map(TrackedRepo::record)
    }

    pub fn find_repo_ignore_case(&self, id: &str) -> Option<RepositoryRecord> {
        self.repos
            .read()
            .iter()
            .find(|repo| repo.stored.id.eq_ignore_ascii_case(id))
            .map(TrackedRepo::record)
    }

    pub fn len(&self) -> usize {
        self.repos.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn indexer(&self, id: &str) -> Option<Arc<Indexer>> {
        self.repos
            .read()
            .iter()
            .find(|repo| repo.stored.id == id)
            .map(|repo| Arc::clone(&repo.indexer))
    }

    fn indexers(&self) -> Vec<Arc<Indexer>> {
        self.repos
            .read()
            .iter()
            .map(|repo| Arc::clone(&repo.indexer))
            .collect()
    }

    fn ids(&self) -> Vec<String> {
        self.repos
            .read()
            .iter()
            .map(|repo| repo.stored.id.clone())
            .collect()
    }

    fn id_for_path(&self, path: &Path) -> Option<String> {
        self.repos
            .read()
            .iter()
            .find(|repo| repo.stored.fullpath == path)
            .map(|repo| repo.stored.id.clone())
    }

    /// Caller must hold the writer lock
    fn remove_where(&self, matches: impl Fn(&StoredRepository) -> bool) -> Result<bool> {
        let (removed, previous, snapshot) = {
            let mut repos = self.repos.write();
            let previous = repos.clone();
            let (removed, kept): (Vec<TrackedRepo>, Vec<TrackedRepo>) =
                repos.drain(..).partition(|repo| matches(&repo.stored));
            *repos = kept;
            (removed, previous, stored_list(&repos))
        };

        if removed.is_empty() {
            return Ok(false);
        }

        if let Err(e) = self.persist(&snapshot) {
            *self.repos.write() = previous;
            return Err(e);
        }

        for repo in &removed {
            log::info!(
                "Untracking {} ({})",
                repo.stored.fullpath.display(),
                repo.stored.id
            );
            repo.indexer.delete_index();
        }
        Ok(true)
    }

    fn persist(&self, repos: &[StoredRepository]) -> Result<()> {
        self.store.set(KEY_REPOSITORIES, &repos)
    }
}

fn stored_list(repos: &[TrackedRepo]) -> Vec<StoredRepository> {
    repos.iter().map(|repo| repo.stored.clone()).collect()
}

fn default_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
