use crate::core::error::{Result, SourceBridgeError};
use std::path::PathBuf;

const APP_DIR: &str = "source-bridge";

pub fn get_config_directory() -> Result<PathBuf> {
    let base = match std::env::consts::OS {
        "linux" | "freebsd" | "netbsd" | "openbsd" => std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .ok()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config"))),
        "macos" => dirs::home_dir().map(|home| home.join("Library/Application Support")),
        _ => dirs::config_dir(),
    };

    base.map(|dir| dir.join(APP_DIR))
        .ok_or(SourceBridgeError::ConfigDirectoryNotFound)
}

/// Managed storage layout rooted at one directory
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
}

impl AppPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_environment() -> Result<Self> {
        Ok(Self::new(get_config_directory()?))
    }

    pub fn store_file(&self) -> PathBuf {
        self.root.join("store.json")
    }

    /// Shallow Git mirrors live here, one directory per project
    pub fn git_mirror_root(&self) -> PathBuf {
        self.root.join("git-mirrors")
    }

    /// Root of the managed Perforce client
    pub fn perforce_root(&self) -> PathBuf {
        self.root.join("perforce")
    }
}
