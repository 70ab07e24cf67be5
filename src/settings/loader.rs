//! Settings loader that merges multiple layers.

use super::SettingsLayer;
use crate::error::{Result, WatchError};
use serde::de::DeserializeOwned;

/// Loads and merges settings from multiple layers.
///
/// Layers are merged in priority order (lowest first), so higher priority
/// layers override values from lower priority ones. Keys no layer defines
/// fall back to the serde defaults of the target type.
pub struct SettingsLoader {
    layers: Vec<Box<dyn SettingsLayer>>,
}

impl SettingsLoader {
    /// Create a new loader.
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Add a settings layer.
    pub fn add_layer(&mut self, layer: Box<dyn SettingsLayer>) {
        self.layers.push(layer);
    }

    /// Load and merge settings from all layers.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No layer was added
    /// - Any layer fails to load
    /// - Deserialization fails
    pub fn load<T>(&self) -> Result<T>
    where
        T: DeserializeOwned,
    {
        if self.layers.is_empty() {
            return Err(WatchError::LoadError(
                "No settings layers specified".to_string(),
            ));
        }

        let mut builder = config::Config::builder();

        for layer in self.sorted_layers() {
            let values = layer.load().map_err(|e| {
                WatchError::LoadError(format!("Failed to load layer '{}': {}", layer.name(), e))
            })?;
            tracing::debug!(layer = %layer.name(), keys = values.len(), "merging settings layer");

            for (key, value) in values {
                builder = builder.set_override(&key, value).map_err(|e| {
                    WatchError::LoadError(format!(
                        "Failed to merge layer '{}': {}",
                        layer.name(),
                        e
                    ))
                })?;
            }
        }

        let settings = builder
            .build()
            .map_err(|e| WatchError::LoadError(format!("Failed to build settings: {}", e)))?;

        settings.try_deserialize::<T>().map_err(|e| {
            WatchError::DeserializationError(format!("Failed to deserialize settings: {}", e))
        })
    }

    /// Get the list of layer names in priority order.
    pub fn layer_names(&self) -> Vec<String> {
        self.sorted_layers().iter().map(|l| l.name()).collect()
    }

    fn sorted_layers(&self) -> Vec<&dyn SettingsLayer> {
        let mut sorted: Vec<&dyn SettingsLayer> = self.layers.iter().map(|l| l.as_ref()).collect();
        sorted.sort_by_key(|l| l.priority());
        sorted
    }
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}
