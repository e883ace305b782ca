//! Checks applied to every inbound request before it reaches registry data.
//!
//! # Public API
//! - [`directory_traversal_guard`]: keep a relative path inside its repository
//! - [`repo_id_resolver`]: case-insensitive repository lookup
//! - [`OriginGate`]: decide whether a requesting origin may use the API

use crate::core::error::{Result, SourceBridgeError};
use crate::core::registry::RepoRegistry;
use crate::core::state::RepositoryRecord;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use url::Url;

/// Join `relative_path` onto the repository root and refuse anything that lands
/// outside it. The join is lexical: `..` is resolved without touching the disk.
pub fn directory_traversal_guard(repo: &RepositoryRecord, relative_path: &str) -> Result<PathBuf> {
    let root = normalize(&repo.fullpath);
    // accept both separators regardless of platform
    let relative = relative_path.replace('\\', "/");
    let joined = normalize(&root.join(relative));

    if !joined.starts_with(&root) {
        log::warn!(
            "Rejected path '{relative_path}' outside {}",
            repo.fullpath.display()
        );
        return Err(SourceBridgeError::path_traversal(relative_path));
    }
    Ok(joined)
}

fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

pub fn repo_id_resolver(registry: &RepoRegistry, repo_id: &str) -> Result<RepositoryRecord> {
    registry
        .find_repo_ignore_case(repo_id)
        .ok_or_else(|| SourceBridgeError::repository_not_found(repo_id))
}

/// Which origins are trusted outright and which need a server-side check
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    pub local_origin: String,
    pub trusted_suffixes: Vec<String>,
    pub conditional_suffix: String,
}

impl Default for OriginPolicy {
    fn default() -> Self {
        Self {
            local_origin: "http://localhost:44512".to_string(),
            trusted_suffixes: vec![".sourcebridge.io".to_string(), ".sourcebridge.app".to_string()],
            conditional_suffix: ".sourcebridge.cloud".to_string(),
        }
    }
}

#[async_trait]
pub trait OriginVerifier: Send + Sync {
    /// Ask the allow-list whether `origin` may connect
    async fn verify(&self, origin: &str) -> Result<bool>;
}

#[derive(Deserialize)]
struct VerifyResponse {
    allowed: bool,
}

pub struct HttpOriginVerifier {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpOriginVerifier {
    pub const DEFAULT_ENDPOINT: &'static str = "https://verify.sourcebridge.io/v1/origins";

    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

impl Default for HttpOriginVerifier {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ENDPOINT)
    }
}

#[async_trait]
impl OriginVerifier for HttpOriginVerifier {
    async fn verify(&self, origin: &str) -> Result<bool> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("origin", origin)])
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await?
            .error_for_status()?;
        let body: VerifyResponse = response.json().await?;
        Ok(body.allowed)
    }
}

pub struct OriginGate {
    policy: OriginPolicy,
    verifier: Arc<dyn OriginVerifier>,
    skip_verification: bool,
    /// Origins the verifier accepted this session. Held across the verification
    /// call so one origin is never checked twice concurrently.
    verified: tokio::sync::Mutex<HashSet<String>>,
}

impl OriginGate {
    pub fn new(
        policy: OriginPolicy,
        verifier: Arc<dyn OriginVerifier>,
        skip_verification: bool,
    ) -> Self {
        Self {
            policy,
            verifier,
            skip_verification,
            verified: tokio::sync::Mutex::new(HashSet::new()),
        }
    }

    pub async fn is_allowed(&self, origin: &str) -> bool {
        if origin == self.policy.local_origin {
            return true;
        }

        let Some(url) = parse_origin(origin) else {
            log::debug!("Denied malformed origin {origin}");
            return false;
        };
        let Some(host) = url.host_str() else {
            log::debug!("Denied origin without host {origin}");
            return false;
        };

        if self
            .policy
            .trusted_suffixes
            .iter()
            .any(|suffix| host_matches(host, suffix))
        {
            return true;
        }

        if !host_matches(host, &self.policy.conditional_suffix) {
            log::debug!("Denied origin {origin}");
            return false;
        }

        if self.skip_verification {
            log::debug!("Origin verification skipped for {origin}");
            return true;
        }

        let key = url.origin().ascii_serialization();
        let mut verified = self.verified.lock().await;
        if verified.contains(&key) {
            return true;
        }

        match self.verifier.verify(&key).await {
            Ok(true) => {
                log::info!("Origin {key} verified");
                verified.insert(key);
                true
            }
            Ok(false) => {
                log::warn!("Origin {key} is not on the allow-list");
                false
            }
            Err(e) => {
                log::warn!("Could not verify origin {key}: {e}");
                false
            }
        }
    }

    pub async fn check(&self, origin: &str) -> Result<()> {
        if self.is_allowed(origin).await {
            Ok(())
        } else {
            Err(SourceBridgeError::origin_rejected(origin))
        }
    }
}

/// An origin is `https://host[:port]` and nothing else. Browsers send the scheme
/// in lowercase, so any other spelling is not a genuine origin.
fn parse_origin(origin: &str) -> Option<Url> {
    if !origin.starts_with("https://") {
        return None;
    }
    let url = Url::parse(origin).ok()?;
    let bare = url.scheme() == "https"
        && url.username().is_empty()
        && url.password().is_none()
        && url.path() == "/"
        && url.query().is_none()
        && url.fragment().is_none();
    bare.then_some(url)
}

/// `suffix` is `.domain.tld`; the bare domain matches as well as its subdomains
fn host_matches(host: &str, suffix: &str) -> bool {
    let suffix = suffix.to_ascii_lowercase();
    host.ends_with(&suffix) || host == suffix.trim_start_matches('.')
}
