//! Keyspace notification events.

use super::tables::KEY_SEPARATOR;
use std::fmt;

/// A single keyspace notification delivered through a pattern subscription.
///
/// The watcher does not interpret events; the accessors below only split the
/// channel name for display and filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyspaceEvent {
    /// Pattern the event matched, e.g. `__keyspace@4__:PORT|*`.
    pub pattern: String,
    /// Channel the event was published on, e.g. `__keyspace@4__:PORT|Ethernet0`.
    pub channel: String,
    /// Notification payload, the command that touched the key (`hset`, `del`, ...).
    pub operation: String,
}

impl KeyspaceEvent {
    /// Create a new event.
    pub fn new(
        pattern: impl Into<String>,
        channel: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self {
            pattern: pattern.into(),
            channel: channel.into(),
            operation: operation.into(),
        }
    }

    /// The key the notification refers to (channel without the keyspace prefix).
    pub fn key(&self) -> Option<&str> {
        let rest = self.channel.strip_prefix("__keyspace@")?;
        let (_db, key) = rest.split_once("__:")?;
        Some(key)
    }

    /// The table part of the key.
    pub fn table(&self) -> Option<&str> {
        self.key()
            .map(|key| key.split_once(KEY_SEPARATOR).map_or(key, |(table, _)| table))
    }
}

impl fmt::Display for KeyspaceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.channel, self.operation, self.pattern)
    }
}
