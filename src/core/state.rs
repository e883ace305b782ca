//! Repository records.
//!
//! - [`StoredRepository`]: what is persisted for each tracked directory
//! - [`RepositoryRecord`]: a stored repository joined with its live index state
//! - [`NewRepository`]: input to `RepoRegistry::add`

use crate::core::indexer::{IndexSnapshot, IndexStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRepository {
    pub id: String,
    pub repo_name: String,
    pub fullpath: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryRecord {
    pub id: String,
    pub repo_name: String,
    pub fullpath: PathBuf,
    pub index_done: bool,
    pub index_running: bool,
    pub index_status: IndexStatus,
    pub indexed_at: Option<DateTime<Utc>>,
    pub tree_list: Vec<String>,
}

impl RepositoryRecord {
    pub fn from_parts(stored: &StoredRepository, index: IndexSnapshot) -> Self {
        Self {
            id: stored.id.clone(),
            repo_name: stored.repo_name.clone(),
            fullpath: stored.fullpath.clone(),
            index_done: index.status == IndexStatus::Done,
            index_running: index.status == IndexStatus::Running,
            index_status: index.status,
            indexed_at: index.indexed_at,
            tree_list: index.files,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRepository {
    pub fullpath: PathBuf,
    #[serde(default)]
    pub repo_name: String,
    /// Caller-supplied id, e.g. a Perforce depot. Resolved from the path when absent.
    #[serde(default)]
    pub id: Option<String>,
}

impl NewRepository {
    pub fn new(fullpath: impl Into<PathBuf>) -> Self {
        Self {
            fullpath: fullpath.into(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, repo_name: impl Into<String>) -> Self {
        self.repo_name = repo_name.into();
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}
