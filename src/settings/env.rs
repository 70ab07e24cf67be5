//! Environment variable settings layer.

use super::SettingsLayer;
use crate::error::{Result, WatchError};
use config::Environment;
use std::collections::HashMap;

/// Keys whose environment values are comma separated lists.
const LIST_KEYS: [&str; 1] = ["tables"];

/// Environment variable settings layer.
///
/// Reads variables carrying a prefix, e.g. `KEYSPACE_WATCHER_REDIS_URL` for
/// `redis_url`. List keys (`tables`) are split on commas.
///
/// # Examples
///
/// ```rust
/// use keyspace_watcher::settings::EnvLayer;
///
/// // KEYSPACE_WATCHER_TABLES=PORT,NTP -> tables = ["PORT", "NTP"]
/// let layer = EnvLayer::new("KEYSPACE_WATCHER", "__");
/// ```
pub struct EnvLayer {
    prefix: String,
    separator: String,
    priority: i32,
}

impl EnvLayer {
    /// Create a new environment variable layer.
    ///
    /// # Arguments
    ///
    /// * `prefix` - Prefix for environment variables (e.g., "KEYSPACE_WATCHER")
    /// * `separator` - Separator for nested keys (e.g., "__")
    pub fn new(prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            separator: separator.into(),
            priority: 300,
        }
    }

    /// Set the priority for this layer.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl SettingsLayer for EnvLayer {
    fn load(&self) -> Result<HashMap<String, config::Value>> {
        let mut env_source = Environment::with_prefix(&self.prefix)
            .prefix_separator("_")
            .separator(&self.separator)
            .list_separator(",")
            .try_parsing(true);
        for key in LIST_KEYS {
            env_source = env_source.with_list_parse_key(key);
        }

        let settings = config::Config::builder()
            .add_source(env_source)
            .build()
            .map_err(|e| {
                WatchError::LoadError(format!("Failed to load environment variables: {}", e))
            })?;

        settings
            .try_deserialize::<HashMap<String, config::Value>>()
            .map_err(|e| {
                WatchError::DeserializationError(format!(
                    "Failed to parse environment variables: {}",
                    e
                ))
            })
    }

    fn name(&self) -> String {
        format!("env:{}*", self.prefix)
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}
