//! Per-repository file indexer.
//!
//! An [`Indexer`] walks one repository root on a blocking worker and produces the
//! list of file paths relative to that root, `/`-separated on every platform, in
//! walk order. Dependency caches, VCS metadata and IDE folders are skipped, as are
//! generated and binary assets.
//!
//! # Runs and generations
//! Every run is stamped with a generation number. `delete_index` and a new `index`
//! call both advance the generation; a walker whose generation is no longer current
//! stops at the next entry and never commits its results. This keeps at most one
//! run "current" per repository without polling for the previous walk to finish.
//!
//! # Cap
//! A run stops after [`MAX_TREE_FILES`] entries. The partial list is kept, the run
//! ends in [`IndexStatus::CapReached`] (not `Done`) and one
//! [`IndexDiagnostic::CapReached`] with an extension histogram is reported.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use walkdir::{DirEntry, WalkDir};

pub const MAX_TREE_FILES: usize = 50_000;

/// Entries kept in the cap-reached histogram
const HISTOGRAM_LIMIT: usize = 20;

const IGNORED_DIRS: &[&str] = &[
    // VCS metadata
    ".git",
    ".hg",
    ".svn",
    // dependency caches
    "node_modules",
    "bower_components",
    "jspm_packages",
    ".venv",
    "venv",
    "__pycache__",
    ".gradle",
    ".m2",
    ".yarn",
    ".npm",
    ".cache",
    // IDE folders
    ".idea",
    ".vscode",
    ".vs",
];

const IGNORED_SUFFIXES: &[&str] = &[
    // generated
    ".min.js",
    ".min.css",
    ".map",
    ".pyc",
    ".class",
    ".o",
    ".obj",
    ".dll",
    ".exe",
    ".so",
    ".dylib",
    ".jar",
    // binary assets
    ".png",
    ".jpg",
    ".jpeg",
    ".gif",
    ".ico",
    ".bmp",
    ".webp",
    ".woff",
    ".woff2",
    ".ttf",
    ".eot",
    ".mp3",
    ".mp4",
    ".zip",
    ".gz",
    ".tar",
    ".pdf",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum IndexStatus {
    Idle,
    Running,
    Done,
    CapReached,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct IndexSnapshot {
    pub status: IndexStatus,
    pub files: Vec<String>,
    pub indexed_at: Option<DateTime<Utc>>,
}

impl Default for IndexSnapshot {
    fn default() -> Self {
        Self {
            status: IndexStatus::Idle,
            files: Vec::new(),
            indexed_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndexDiagnostic {
    CapReached {
        root: PathBuf,
        limit: usize,
        /// `(extension, count)`, most frequent first
        histogram: Vec<(String, usize)>,
    },
}

/// Receives indexing diagnostics. Indexing never fails loudly; this is the only
/// channel through which limit conditions surface.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: IndexDiagnostic);
}

/// Writes diagnostics to the log
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&self, diagnostic: IndexDiagnostic) {
        match diagnostic {
            IndexDiagnostic::CapReached {
                root,
                limit,
                histogram,
            } => {
                let summary = histogram
                    .iter()
                    .map(|(ext, count)| format!("{ext}={count}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                log::warn!(
                    "Index of {} stopped at {limit} files. Extensions: {summary}",
                    root.display()
                );
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndexOptions {
    pub max_files: usize,
    pub ignored_dirs: Vec<String>,
    pub ignored_suffixes: Vec<String>,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            max_files: MAX_TREE_FILES,
            ignored_dirs: IGNORED_DIRS.iter().map(|s| s.to_string()).collect(),
            ignored_suffixes: IGNORED_SUFFIXES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl IndexOptions {
    fn is_ignored_dir(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        self.ignored_dirs
            .iter()
            .any(|ignored| name.eq_ignore_ascii_case(ignored))
    }

    fn is_ignored_file(&self, path: &Path) -> bool {
        let Some(name) = path.file_name() else {
            return true;
        };
        let name = name.to_string_lossy().to_ascii_lowercase();
        self.ignored_suffixes
            .iter()
            .any(|suffix| name.ends_with(suffix.as_str()))
    }
}

enum WalkOutcome {
    Complete(Vec<String>),
    Capped(Vec<String>),
    Stopped,
}

pub struct Indexer {
    root: PathBuf,
    options: IndexOptions,
    generation: AtomicU64,
    state: watch::Sender<IndexSnapshot>,
    sink: Arc<dyn DiagnosticSink>,
}

impl Indexer {
    pub fn new(
        root: impl Into<PathBuf>,
        options: IndexOptions,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(IndexSnapshot::default());
        Arc::new(Self {
            root: root.into(),
            options,
            generation: AtomicU64::new(0),
            state,
            sink,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn snapshot(&self) -> IndexSnapshot {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> IndexStatus {
        self.state.borrow().status
    }

    pub fn is_done(&self) -> bool {
        self.status() == IndexStatus::Done
    }

    pub fn is_running(&self) -> bool {
        self.status() == IndexStatus::Running
    }

    /// Start a walk on a blocking worker. Returns `false` without doing anything when
    /// the index is already done or a walk is running. Must be called from within a
    /// tokio runtime.
    pub fn index(self: &Arc<Self>) -> bool {
        let mut generation = 0;
        let started = self.state.send_if_modified(|state| {
            if matches!(state.status, IndexStatus::Running | IndexStatus::Done) {
                return false;
            }
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            state.status = IndexStatus::Running;
            state.files.clear();
            state.indexed_at = None;
            true
        });

        if !started {
            log::debug!("Index of {} already done or running", self.root.display());
            return false;
        }

        log::debug!("Indexing {} (generation {generation})", self.root.display());
        let indexer = Arc::clone(self);
        tokio::task::spawn_blocking(move || indexer.run(generation));
        true
    }

    /// Cancel any running walk and drop the results
    pub fn delete_index(&self) {
        self.state.send_modify(|state| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            state.status = if state.status == IndexStatus::Running {
                IndexStatus::Stopped
            } else {
                IndexStatus::Idle
            };
            state.files.clear();
            state.indexed_at = None;
        });
    }

    /// Drop the current results and walk again. The previous walk, if any, is
    /// invalidated and cannot overwrite the new run.
    pub fn re_index(self: &Arc<Self>) -> bool {
        self.delete_index();
        self.index()
    }

    /// Wait until no walk is running and return the resulting status
    pub async fn wait_until_settled(&self) -> IndexStatus {
        let mut rx = self.state.subscribe();
        let settled = rx
            .wait_for(|state| state.status != IndexStatus::Running)
            .await
            .map(|state| state.status);
        settled.unwrap_or_else(|_| self.status())
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn run(&self, generation: u64) {
        match walk(&self.root, &self.options, || self.is_current(generation)) {
            WalkOutcome::Stopped => {
                log::debug!(
                    "Index of {} superseded (generation {generation})",
                    self.root.display()
                );
            }
            WalkOutcome::Complete(files) => {
                let count = files.len();
                if self.commit(generation, files, IndexStatus::Done) {
                    log::info!("Indexed {} ({count} files)", self.root.display());
                }
            }
            WalkOutcome::Capped(files) => {
                let histogram = extension_histogram(&files);
                if self.commit(generation, files, IndexStatus::CapReached) {
                    self.sink.report(IndexDiagnostic::CapReached {
                        root: self.root.clone(),
                        limit: self.options.max_files,
                        histogram,
                    });
                }
            }
        }
    }

    fn commit(&self, generation: u64, files: Vec<String>, status: IndexStatus) -> bool {
        self.state.send_if_modified(|state| {
            if !self.is_current(generation) {
                return false;
            }
            state.status = status;
            state.files = files;
            state.indexed_at = Some(Utc::now());
            true
        })
    }
}

fn walk(root: &Path, options: &IndexOptions, keep_going: impl Fn() -> bool) -> WalkOutcome {
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !options.is_ignored_dir(entry));

    for entry in walker {
        if !keep_going() {
            return WalkOutcome::Stopped;
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::debug!("Skipping unreadable entry under {}: {e}", root.display());
                continue;
            }
        };

        if !entry.file_type().is_file() || options.is_ignored_file(entry.path()) {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };

        if files.len() >= options.max_files {
            return WalkOutcome::Capped(files);
        }
        files.push(normalize_relative(relative));
    }

    WalkOutcome::Complete(files)
}

/// Join path components with `/` regardless of host separator
pub fn normalize_relative(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn extension_histogram(files: &[String]) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for file in files {
        let name = file.rsplit('/').next().unwrap_or(file);
        let ext = match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
            _ => "(none)".to_string(),
        };
        *counts.entry(ext).or_default() += 1;
    }

    let mut histogram: Vec<(String, usize)> = counts.into_iter().collect();
    histogram.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    histogram.truncate(HISTOGRAM_LIMIT);
    histogram
}
