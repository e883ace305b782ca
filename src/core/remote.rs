//! Remote URL parsing.
//!
//! A [`RemoteIdentity`] is the `(host, owner, project)` triple behind a Git remote.
//! Protocol, port and credentials are dropped so that `https://`, `ssh://`,
//! scp-style and token-bearing URLs for the same project compare equal.

use crate::core::error::{Result, SourceBridgeError};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteIdentity {
    pub host: String,
    pub owner: String,
    pub project: String,
}

impl RemoteIdentity {
    pub fn parse(url: &str) -> Result<Self> {
        let url = url.trim();
        let (host, path) =
            split_host_and_path(url).ok_or_else(|| SourceBridgeError::invalid_remote(url))?;

        let mut segments: Vec<&str> = path
            .split(['/', '\\'])
            .filter(|segment| !segment.is_empty())
            .collect();

        // Bitbucket Server serves clones under /scm/<project>/<repo>
        if segments.len() > 2 && segments[0].eq_ignore_ascii_case("scm") {
            segments.remove(0);
        }

        let project = segments
            .pop()
            .map(|name| name.strip_suffix(".git").unwrap_or(name))
            .filter(|name| !name.is_empty())
            .ok_or_else(|| SourceBridgeError::invalid_remote(url))?;

        Ok(Self {
            host: host.to_ascii_lowercase(),
            owner: segments.join("/"),
            project: project.to_string(),
        })
    }

    /// Stable key for table lookups, case-insensitive
    pub fn key(&self) -> String {
        format!("{}/{}/{}", self.host, self.owner, self.project).to_ascii_lowercase()
    }

    pub fn same_project(&self, other: &RemoteIdentity) -> bool {
        self.key() == other.key()
    }
}

impl fmt::Display for RemoteIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.host, self.owner, self.project)
    }
}

/// Host part of a server URL such as `https://bb.corp.local:7990`
pub fn host_of(url: &str) -> Option<String> {
    split_host_and_path(url.trim())
        .map(|(host, _)| host.to_ascii_lowercase())
        .filter(|host| !host.is_empty())
}

/// Remotes reached through the local transport
pub fn is_local_url(url: &str) -> bool {
    url.starts_with("file://")
        || url.starts_with('/')
        || url.starts_with('.')
        || is_drive_path(url)
}

/// `C:\repos\x` or `C:/repos/x`, which would otherwise read as scp syntax
fn is_drive_path(url: &str) -> bool {
    let bytes = url.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && matches!(bytes[2], b'\\' | b'/')
}

fn split_host_and_path(url: &str) -> Option<(String, String)> {
    if let Some(rest) = url.strip_prefix("file://") {
        return Some((String::new(), rest.to_string()));
    }

    if let Some((_, rest)) = url.split_once("://") {
        let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));
        let host = strip_port(strip_userinfo(authority));
        if host.is_empty() {
            return None;
        }
        return Some((host.to_string(), path.to_string()));
    }

    if url.starts_with('/') || url.starts_with('.') || is_drive_path(url) {
        return Some((String::new(), url.to_string()));
    }

    // scp-like syntax: [user@]host:owner/project.git
    let (authority, path) = url.split_once(':')?;
    let host = strip_userinfo(authority);
    if host.is_empty() || path.is_empty() {
        return None;
    }
    Some((host.to_string(), path.to_string()))
}

fn strip_userinfo(authority: &str) -> &str {
    authority
        .rsplit_once('@')
        .map(|(_, host)| host)
        .unwrap_or(authority)
}

fn strip_port(host: &str) -> &str {
    match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    }
}
