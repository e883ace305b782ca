use crate::core::error::Result;
use crate::core::store::JsonStore;
use serde::{Deserialize, Serialize};

pub const KEY_REPOSITORIES: &str = "repositories";
pub const KEY_ALLOW_INDEX: &str = "allowIndex";
pub const KEY_PERFORCE: &str = "perforce";
pub const KEY_BITBUCKET: &str = "bitbucket";
pub const KEY_ACCESS_TOKEN: &str = "accessToken";
pub const KEY_LOG_LEVEL: &str = "logLevel";
pub const KEY_STRICT_ADD: &str = "strictAdd";
pub const KEY_SKIP_ORIGIN_VERIFICATION: &str = "skipOriginVerification";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PerforceSettings {
    /// `host:port` or `ssl:host:port`
    pub connection_string: String,
    /// Seconds
    pub timeout: u64,
    pub username: String,
}

impl Default for PerforceSettings {
    fn default() -> Self {
        Self {
            connection_string: String::new(),
            timeout: 5,
            username: String::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BitbucketSettings {
    pub url: String,
    pub token: String,
    /// Project keys that may be synced; empty means no restriction
    #[serde(default)]
    pub projects: Vec<String>,
}

/// Typed view over the persisted settings keys
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub perforce: Option<PerforceSettings>,
    pub bitbucket: Option<BitbucketSettings>,
    pub access_token: Option<String>,
    pub log_level: Option<String>,
    pub strict_add: bool,
    pub skip_origin_verification: bool,
}

impl Settings {
    pub fn load(store: &JsonStore) -> Self {
        Self {
            perforce: store.get_or(KEY_PERFORCE, None),
            bitbucket: store.get_or(KEY_BITBUCKET, None),
            access_token: store.get_or(KEY_ACCESS_TOKEN, None),
            log_level: store.get_or(KEY_LOG_LEVEL, None),
            strict_add: store.get_or(KEY_STRICT_ADD, false),
            skip_origin_verification: store.get_or(KEY_SKIP_ORIGIN_VERIFICATION, false),
        }
    }

    pub fn save(&self, store: &JsonStore) -> Result<()> {
        store.set(KEY_PERFORCE, &self.perforce)?;
        store.set(KEY_BITBUCKET, &self.bitbucket)?;
        store.set(KEY_ACCESS_TOKEN, &self.access_token)?;
        store.set(KEY_LOG_LEVEL, &self.log_level)?;
        store.set(KEY_STRICT_ADD, &self.strict_add)?;
        store.set(KEY_SKIP_ORIGIN_VERIFICATION, &self.skip_origin_verification)?;
        Ok(())
    }

    pub fn log_filter(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }
}
