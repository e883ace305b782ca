//! Source Bridge - discover and read source files across plain folders, Git
//! mirrors and Perforce depots through one stable id per repository.
//!
//! # Public API
//! The main public interface is re-exported from the [`core`] module:
//! - Repository registry and background file indexing
//! - Git mirror and Perforce workspace management
//! - Stable repository identities from VCS remotes
//! - Path containment and origin checks

pub mod commands;
pub mod core;

pub use core::{
    directory_traversal_guard,
    repo_id_resolver,
    AppContext,
    ErrorKind,
    GitSyncManager,
    GitSyncRequest,
    IndexStatus,
    NewRepository,
    OriginGate,
    PerforceManager,
    RemoteIdentity,
    RepoRegistry,
    RepositoryRecord,
    Result,
    SourceBridgeError,
};
