//! Core functionality for source-bridge.
//!
//! The registry of tracked repositories with its background indexer, the Git and
//! Perforce sync layers that materialise sources on disk, and the access checks
//! that front them.

pub mod access;
pub mod config;
pub mod context;
pub mod dirs;
pub mod error;
pub mod git_sync;
pub mod identity;
pub mod indexer;
pub mod output;
pub mod perforce;
pub mod registry;
pub mod remote;
pub mod state;
pub mod store;

// === Error handling ===
pub use error::{ErrorKind, Result, SourceBridgeError};

// === Registry and indexing ===
pub use indexer::{IndexSnapshot, IndexStatus, Indexer};
pub use registry::{AddMode, RegistryOptions, RepoRegistry};
pub use state::{NewRepository, RepositoryRecord};

// === Sync layers ===
pub use git_sync::{GitCredentials, GitSyncManager, GitSyncRequest};
pub use perforce::{PerforceManager, SwitchResult, ViewMapping};
pub use remote::RemoteIdentity;

// === Access checks ===
pub use access::{directory_traversal_guard, repo_id_resolver, OriginGate};

// === Startup ===
pub use context::AppContext;

// === Output formatting ===
pub use output::{print_error, print_info, print_section_header, print_success};
