//! Settings layer trait.

use crate::error::Result;
use std::collections::HashMap;

/// A source of watcher settings.
///
/// Layers are merged by priority; a higher priority layer overrides the keys
/// it defines and leaves the others untouched.
pub trait SettingsLayer: Send + Sync {
    /// Load settings as a raw key-value map.
    ///
    /// # Errors
    ///
    /// Returns an error if the layer cannot be read or parsed.
    fn load(&self) -> Result<HashMap<String, config::Value>>;

    /// Get a human-readable name for this layer (for logging/debugging).
    fn name(&self) -> String;

    /// Get the priority of this layer (higher = takes precedence).
    ///
    /// Default priorities:
    /// - Environment variables: 300
    /// - Settings file: 100
    fn priority(&self) -> i32 {
        100
    }
}
