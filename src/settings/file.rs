//! File-based settings layer.

use super::SettingsLayer;
use crate::error::{Result, WatchError};
use config::File;
use std::collections::HashMap;
use std::path::PathBuf;

/// File-based settings layer.
///
/// Loads settings from YAML, TOML, or JSON files with format detection
/// based on the file extension.
///
/// # Examples
///
/// ```rust,no_run
/// use keyspace_watcher::settings::FileLayer;
///
/// let layer = FileLayer::new("/etc/keyspace-watcher/watcher.toml").optional();
/// ```
pub struct FileLayer {
    path: PathBuf,
    priority: i32,
    required: bool,
}

impl FileLayer {
    /// Create a new, required file layer.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            priority: 100,
            required: true,
        }
    }

    /// Set the priority for this layer.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Treat a missing file as an empty layer instead of an error.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Validate that the file extension is supported.
    fn validate_extension(&self) -> Result<()> {
        let extension = self
            .path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| {
                WatchError::LoadError(format!(
                    "Unable to determine file format for: {}",
                    self.path.display()
                ))
            })?;

        match extension {
            "yaml" | "yml" | "toml" | "json" => Ok(()),
            _ => Err(WatchError::LoadError(format!(
                "Unsupported file extension: {}. Supported: .yaml, .yml, .toml, .json",
                extension
            ))),
        }
    }
}

impl SettingsLayer for FileLayer {
    fn load(&self) -> Result<HashMap<String, config::Value>> {
        self.validate_extension()?;

        if !self.path.exists() {
            if self.required {
                return Err(WatchError::LoadError(format!(
                    "Settings file not found: {}",
                    self.path.display()
                )));
            }
            tracing::debug!(path = %self.path.display(), "optional settings file absent");
            return Ok(HashMap::new());
        }

        let settings = config::Config::builder()
            .add_source(File::from(self.path.clone()).required(true))
            .build()
            .map_err(|e| WatchError::LoadError(format!("Failed to load file: {}", e)))?;

        settings
            .try_deserialize::<HashMap<String, config::Value>>()
            .map_err(|e| WatchError::DeserializationError(format!("Failed to parse file: {}", e)))
    }

    fn name(&self) -> String {
        format!("file:{}", self.path.display())
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_validate_extension() {
        for name in ["w.yaml", "w.yml", "w.toml", "w.json"] {
            assert!(FileLayer::new(name).validate_extension().is_ok(), "{name}");
        }
        assert!(FileLayer::new("w.txt").validate_extension().is_err());
        assert!(FileLayer::new("watcher").validate_extension().is_err());
    }

    #[test]
    fn test_load_toml_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("watcher.toml");
        fs::write(
            &path,
            r#"
redis_url = "redis://10.0.0.1:6379"
strategy = "poll"
tables = ["PORT", "NTP"]
"#,
        )
        .unwrap();

        let map = FileLayer::new(&path).load().unwrap();
        assert_eq!(map.len(), 3);
        assert!(map.contains_key("redis_url"));
        assert!(map.contains_key("tables"));
    }

    #[test]
    fn test_required_file_missing() {
        let layer = FileLayer::new("/nonexistent/watcher.yaml");
        assert!(layer.load().is_err());
    }

    #[test]
    fn test_optional_file_missing() {
        let layer = FileLayer::new("/nonexistent/watcher.yaml").optional();
        assert!(layer.load().unwrap().is_empty());
    }

    #[test]
    fn test_with_priority_and_name() {
        let layer = FileLayer::new("watcher.yaml").with_priority(200);
        assert_eq!(layer.priority(), 200);
        assert!(layer.name().contains("watcher.yaml"));
    }
}
