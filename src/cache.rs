use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::encoding;
use crate::user_config::UserConfig;

/// A resolved link, remembered together with the configuration it was
/// resolved under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub config: UserConfig,
    pub link: String,
    pub final_link: String,
    pub filesize: u64,
}

/// Process-wide map from encoded original link to its resolution.
///
/// Values are kept as JSON documents and decoded on read, so a stored config
/// is compared field by field against the requesting one. Writes replace any
/// previous entry for the key. There is no eviction.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: RwLock<HashMap<String, serde_json::Value>>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key under which the resolution of `link` is stored. This is the same
    /// segment the playback URL carries.
    pub fn key_for(link: &str) -> String {
        encoding::encode(link)
    }

    pub async fn put(&self, key: &str, entry: &CacheEntry) {
        match serde_json::to_value(entry) {
            Ok(value) => {
                self.entries.write().await.insert(key.to_string(), value);
                debug!(link = %entry.link, "cached final link");
            }
            Err(e) => {
                warn!(link = %entry.link, error = %e, "failed to serialize cache entry");
            }
        }
    }

    /// Return the entry for `key` only if it was resolved under `config`.
    pub async fn get(&self, key: &str, config: &UserConfig) -> Option<CacheEntry> {
        let value = self.entries.read().await.get(key).cloned()?;

        let entry: CacheEntry = match serde_json::from_value(value) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, error = %e, "discarding undecodable cache entry");
                return None;
            }
        };

        if entry.config != *config {
            debug!(key, "cached entry was resolved under a different config");
            return None;
        }

        Some(entry)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    #[cfg(test)]
    async fn insert_raw(&self, key: &str, value: serde_json::Value) {
        self.entries.write().await.insert(key.to_string(), value);
    }
}
