//! Persisted key-value store.
//!
//! [`JsonStore`] keeps every setting and the repository list in one JSON object
//! written to `store.json`. Each `set` rewrites the whole file through a temp file
//! and a rename so a crash never leaves a half-written store behind. A write that
//! fails leaves the in-memory value as it was.

use crate::core::error::{Result, SourceBridgeError};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

pub struct JsonStore {
    path: Option<PathBuf>,
    values: Mutex<Map<String, Value>>,
}

impl JsonStore {
    /// Open the store at `path`, starting empty when the file does not exist yet
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                Map::new()
            } else {
                match serde_json::from_str::<Value>(&content)? {
                    Value::Object(map) => map,
                    _ => {
                        log::warn!(
                            "Store {} is not a JSON object, starting empty",
                            path.display()
                        );
                        Map::new()
                    }
                }
            }
        } else {
            Map::new()
        };

        Ok(Self {
            path: Some(path),
            values: Mutex::new(values),
        })
    }

    /// Store that never touches the filesystem
    pub fn in_memory() -> Self {
        Self {
            path: None,
            values: Mutex::new(Map::new()),
        }
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let values = self.values.lock();
        match values.get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.get(key) {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(e) => {
                log::warn!("Ignoring unreadable store key '{key}': {e}");
                default
            }
        }
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let mut values = self.values.lock();
        let previous = values.insert(key.to_string(), serde_json::to_value(value)?);
        if let Err(e) = self.flush(&values) {
            match previous {
                Some(previous) => values.insert(key.to_string(), previous),
                None => values.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.values.lock();
        let Some(previous) = values.remove(key) else {
            return Ok(());
        };
        if let Err(e) = self.flush(&values) {
            values.insert(key.to_string(), previous);
            return Err(e);
        }
        Ok(())
    }

    fn flush(&self, values: &Map<String, Value>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(values)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, content)
            .map_err(|e| SourceBridgeError::store_write_failed(&tmp, e))?;
        std::fs::rename(&tmp, path)
            .map_err(|e| SourceBridgeError::store_write_failed(path, e))?;
        Ok(())
    }
}
