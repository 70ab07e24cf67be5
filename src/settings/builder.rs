//! Builder for loading watcher settings.

use super::{
    CONFIG_PATH_ENV, ENV_PREFIX, EnvLayer, FileLayer, SettingsLayer, SettingsLoader,
    WatcherSettings,
};
use crate::core::Validate;
use crate::error::Result;
use std::path::PathBuf;

/// Builder for loading [`WatcherSettings`].
///
/// # Examples
///
/// ```rust,no_run
/// use keyspace_watcher::settings::SettingsBuilder;
///
/// # fn example() -> keyspace_watcher::error::Result<()> {
/// let settings = SettingsBuilder::new()
///     .with_optional_file("/etc/keyspace-watcher/watcher.yaml")
///     .with_env_overrides("KEYSPACE_WATCHER", "__")
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct SettingsBuilder {
    files: Vec<(PathBuf, bool)>,
    env_prefix: Option<String>,
    env_separator: Option<String>,
    custom_layers: Vec<Box<dyn SettingsLayer>>,
}

impl SettingsBuilder {
    /// Create a new builder with no layers.
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            env_prefix: None,
            env_separator: None,
            custom_layers: Vec::new(),
        }
    }

    /// The layering used by the watcher binary: the file named by
    /// `KEYSPACE_WATCHER_CONFIG` if set, then `KEYSPACE_WATCHER_*` variables.
    pub fn from_env() -> Self {
        let mut builder = Self::new();
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            builder = builder.with_file(path);
        }
        builder.with_env_overrides(ENV_PREFIX, "__")
    }

    /// Add a required settings file.
    ///
    /// Later files have higher priority and override earlier ones.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push((path.into(), true));
        self
    }

    /// Add a settings file that may be absent.
    pub fn with_optional_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push((path.into(), false));
        self
    }

    /// Add an environment variable layer with the given prefix.
    ///
    /// Environment variables have the highest priority by default (300).
    pub fn with_env_overrides(mut self, prefix: &str, separator: &str) -> Self {
        self.env_prefix = Some(prefix.to_string());
        self.env_separator = Some(separator.to_string());
        self
    }

    /// Add a custom settings layer.
    pub fn with_layer<L: SettingsLayer + 'static>(mut self, layer: L) -> Self {
        self.custom_layers.push(Box::new(layer));
        self
    }

    /// Load, merge and validate the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if a layer cannot be loaded, the merged values cannot
    /// be deserialized, or validation fails.
    pub fn build(self) -> Result<WatcherSettings> {
        let loader = self.into_loader();
        tracing::debug!(layers = ?loader.layer_names(), "loading watcher settings");

        let settings: WatcherSettings = loader.load()?;
        settings.validate()?;
        Ok(settings)
    }

    fn into_loader(self) -> SettingsLoader {
        let mut loader = SettingsLoader::new();

        for (index, (path, required)) in self.files.into_iter().enumerate() {
            let priority = 100 + (index as i32 * 10); // 100, 110, 120, etc.
            let mut layer = FileLayer::new(path).with_priority(priority);
            if !required {
                layer = layer.optional();
            }
            loader.add_layer(Box::new(layer));
        }

        for layer in self.custom_layers {
            loader.add_layer(layer);
        }

        if let (Some(prefix), Some(separator)) = (self.env_prefix, self.env_separator) {
            loader.add_layer(Box::new(EnvLayer::new(prefix, separator)));
        }

        loader
    }
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
