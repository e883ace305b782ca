//! Domain-specific error types and error handling utilities.
//!
//! This module defines [`SourceBridgeError`] which covers every failure mode of the
//! registry, the indexer, the VCS sync layer and the access gate. It uses `thiserror`
//! for ergonomic error definitions and includes constructors for common failures.
//!
//! # Public API
//! - [`SourceBridgeError`]: Main error enum
//! - [`ErrorKind`]: Coarse classification used for logging and telemetry decisions
//! - [`Result<T>`]: Type alias for `std::result::Result<T, SourceBridgeError>`
//!
//! # Error Categories
//! - **NotFound**: unknown repository id, missing path. Benign, never reported as a crash.
//! - **SecurityViolation**: path traversal, rejected origin, remote outside the allow-list
//! - **TransientIo**: git2, Perforce command and network failures
//! - **Misconfiguration**: invalid tool location, tool version too low

use std::path::PathBuf;
use thiserror::Error;

/// Domain-specific error types for source-bridge
#[derive(Error, Debug)]
pub enum SourceBridgeError {
    // Registry errors
    #[error("Repository not found: {id}")]
    RepositoryNotFound { id: String },

    #[error("Path does not exist: {path}")]
    PathNotFound { path: PathBuf },

    // Access gate errors
    #[error("Path escapes repository root: {path}")]
    PathTraversal { path: String },

    #[error("Origin not allowed: {origin}")]
    OriginRejected { origin: String },

    #[error("Remote {url} is not in the allowed project list")]
    RemoteNotAllowed { url: String },

    // Git errors
    #[error("Git repository error: {0}")]
    Git(#[from] git2::Error),

    #[error("Cannot parse remote URL: {url}")]
    InvalidRemote { url: String },

    #[error("Fetch from {url} timed out after {seconds}s")]
    GitTimeout { url: String, seconds: u64 },

    // Perforce errors
    #[error("Perforce command failed: {message}")]
    Perforce { message: String },

    #[error("Perforce command timed out after {seconds}s")]
    PerforceTimeout { seconds: u64 },

    #[error("File is not in client view: {path}")]
    NotInClientView { path: String },

    #[error("Perforce is not connected")]
    PerforceNotConnected,

    #[error("Malformed output from '{command}': missing field '{field}'")]
    MalformedOutput { command: String, field: String },

    // Tooling errors
    #[error("Invalid location: {path}")]
    InvalidLocation { path: PathBuf },

    #[error("Version {found} is too low, {required} or newer is required")]
    VersionTooLow { found: String, required: String },

    // Network errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // File and storage errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Could not find config directory")]
    ConfigDirectoryNotFound,

    #[error("Failed to write store file '{path}': {source}")]
    StoreWriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Coarse error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    SecurityViolation,
    TransientIo,
    Misconfiguration,
    Internal,
}

/// Convenience type alias for Results using SourceBridgeError
pub type Result<T> = std::result::Result<T, SourceBridgeError>;

impl SourceBridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RepositoryNotFound { .. } | Self::PathNotFound { .. } => ErrorKind::NotFound,
            Self::PathTraversal { .. }
            | Self::OriginRejected { .. }
            | Self::RemoteNotAllowed { .. } => ErrorKind::SecurityViolation,
            Self::Git(_)
            | Self::GitTimeout { .. }
            | Self::Perforce { .. }
            | Self::PerforceTimeout { .. }
            | Self::NotInClientView { .. }
            | Self::PerforceNotConnected
            | Self::Http(_)
            | Self::Io(_) => ErrorKind::TransientIo,
            Self::InvalidLocation { .. }
            | Self::VersionTooLow { .. }
            | Self::InvalidRemote { .. }
            | Self::ConfigDirectoryNotFound => ErrorKind::Misconfiguration,
            Self::MalformedOutput { .. }
            | Self::Json(_)
            | Self::StoreWriteFailed { .. }
            | Self::Join(_) => ErrorKind::Internal,
        }
    }

    /// Expected conditions that must not be reported as crashes
    pub fn is_benign(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn repository_not_found(id: impl Into<String>) -> Self {
        Self::RepositoryNotFound { id: id.into() }
    }

    pub fn path_not_found(path: impl Into<PathBuf>) -> Self {
        Self::PathNotFound { path: path.into() }
    }

    pub fn path_traversal(path: impl Into<String>) -> Self {
        Self::PathTraversal { path: path.into() }
    }

    pub fn origin_rejected(origin: impl Into<String>) -> Self {
        Self::OriginRejected {
            origin: origin.into(),
        }
    }

    pub fn remote_not_allowed(url: impl Into<String>) -> Self {
        Self::RemoteNotAllowed { url: url.into() }
    }

    pub fn invalid_remote(url: impl Into<String>) -> Self {
        Self::InvalidRemote { url: url.into() }
    }

    pub fn git_timeout(url: impl Into<String>, seconds: u64) -> Self {
        Self::GitTimeout {
            url: url.into(),
            seconds,
        }
    }

    pub fn perforce(message: impl Into<String>) -> Self {
        Self::Perforce {
            message: message.into(),
        }
    }

    pub fn not_in_client_view(path: impl Into<String>) -> Self {
        Self::NotInClientView { path: path.into() }
    }

    pub fn malformed_output(command: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MalformedOutput {
            command: command.into(),
            field: field.into(),
        }
    }

    pub fn invalid_location(path: impl Into<PathBuf>) -> Self {
        Self::InvalidLocation { path: path.into() }
    }

    pub fn version_too_low(found: impl Into<String>, required: impl Into<String>) -> Self {
        Self::VersionTooLow {
            found: found.into(),
            required: required.into(),
        }
    }

    pub fn store_write_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::StoreWriteFailed {
            path: path.into(),
            source,
        }
    }
}

/// Log an error at a level matching its kind. Benign errors stay at debug level.
pub fn log_error(context: &str, err: &SourceBridgeError) {
    match err.kind() {
        ErrorKind::NotFound => log::debug!("{context}: {err}"),
        ErrorKind::SecurityViolation => log::warn!("{context}: {err}"),
        _ => log::error!("{context}: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SourceBridgeError::repository_not_found("proj/sub");
        assert_eq!(err.to_string(), "Repository not found: proj/sub");
    }

    #[test]
    fn test_not_found_is_benign() {
        assert!(SourceBridgeError::repository_not_found("x").is_benign());
        assert!(SourceBridgeError::path_not_found("/nope").is_benign());
        assert!(!SourceBridgeError::path_traversal("../etc").is_benign());
        assert!(!SourceBridgeError::perforce("connect failed").is_benign());
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            SourceBridgeError::origin_rejected("https://evil.test").kind(),
            ErrorKind::SecurityViolation
        );
        assert_eq!(
            SourceBridgeError::not_in_client_view("//depot/a.c").kind(),
            ErrorKind::TransientIo
        );
        assert_eq!(
            SourceBridgeError::version_too_low("2010.1", "2015.1").kind(),
            ErrorKind::Misconfiguration
        );
        assert_eq!(
            SourceBridgeError::malformed_output("info", "clientName").kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_malformed_output_message() {
        let err = SourceBridgeError::malformed_output("depots", "name");
        assert_eq!(
            err.to_string(),
            "Malformed output from 'depots': missing field 'name'"
        );
    }

    #[test]
    fn test_store_write_failed() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = SourceBridgeError::store_write_failed("/test/store.json", io_err);
        assert!(err.to_string().contains("/test/store.json"));
        assert!(err.to_string().contains("denied"));
    }
}
