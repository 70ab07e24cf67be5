//! Notification source trait.

use crate::core::KeyspaceEvent;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

/// Result of waiting on a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    /// Buffered data is ready to be drained with [`NotificationSource::pops`].
    Ready,
    /// The timeout elapsed without data.
    Timeout,
    /// The wait failed. The source remains usable.
    Error(String),
}

impl fmt::Display for SelectOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "OBJECT"),
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::Error(reason) => write!(f, "ERROR ({})", reason),
        }
    }
}

/// A backend delivering keyspace notifications for pattern subscriptions.
///
/// Sources buffer what they read. [`select`](Self::select) and
/// [`poll`](Self::poll) fill the buffer, [`pops`](Self::pops) empties it.
/// Notifications are not persistent: anything read from the backend has to
/// stay in the buffer until popped or it is lost.
#[async_trait]
pub trait NotificationSource: Send {
    /// Register a pattern subscription.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::SubscribeError`](crate::error::WatchError::SubscribeError)
    /// if the backend rejects the pattern.
    async fn psubscribe(&mut self, pattern: &str) -> Result<()>;

    /// Remove a pattern subscription.
    async fn punsubscribe(&mut self, pattern: &str) -> Result<()>;

    /// Register several patterns, stopping at the first failure.
    async fn psubscribe_many(&mut self, patterns: &[String]) -> Result<()> {
        for pattern in patterns {
            self.psubscribe(pattern).await?;
        }
        Ok(())
    }

    /// Remove several patterns, stopping at the first failure.
    async fn punsubscribe_many(&mut self, patterns: &[String]) -> Result<()> {
        for pattern in patterns {
            self.punsubscribe(pattern).await?;
        }
        Ok(())
    }

    /// Wait until buffered data is available or `timeout` elapses.
    ///
    /// Returns [`SelectOutcome::Ready`] immediately when the buffer is not empty.
    async fn select(&mut self, timeout: Duration) -> SelectOutcome;

    /// Move everything the backend has pending into the buffer without blocking.
    async fn poll(&mut self) -> Result<()>;

    /// Drain the buffer, in arrival order.
    ///
    /// An entry that cannot be decoded is removed and reported as an error,
    /// but only by a call that has not decoded anything yet: events ahead of
    /// it are returned first and the entry is left at the front.
    fn pops(&mut self) -> Result<Vec<KeyspaceEvent>>;

    /// Whether the buffer holds undrained data.
    fn has_data(&self) -> bool;

    /// Currently active patterns.
    fn patterns(&self) -> &PatternSet;

    /// Human-readable name for logging.
    fn name(&self) -> String;
}

/// Set of active subscription patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternSet {
    patterns: BTreeSet<String>,
}

impl PatternSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pattern; returns `false` if it was already present.
    pub fn insert(&mut self, pattern: impl Into<String>) -> bool {
        self.patterns.insert(pattern.into())
    }

    /// Remove a pattern; returns `false` if it was not present.
    pub fn remove(&mut self, pattern: &str) -> bool {
        self.patterns.remove(pattern)
    }

    /// Whether `pattern` is active.
    pub fn contains(&self, pattern: &str) -> bool {
        self.patterns.contains(pattern)
    }

    /// Number of active patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether no pattern is active.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Iterate over the active patterns in lexical order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(String::as_str)
    }
}

/// Turn a raw message into an event, dropping what should not be delivered.
///
/// Messages with an empty payload carry no notification and are skipped.
/// Messages for a pattern that is not active (a late delivery after
/// `punsubscribe`, or a plain channel message) are logged and skipped.
pub fn accept_message(
    patterns: &PatternSet,
    pattern: Option<String>,
    channel: String,
    payload: String,
) -> Option<KeyspaceEvent> {
    if payload.is_empty() {
        tracing::debug!(%channel, "skipping empty keyspace notification");
        return None;
    }

    let Some(pattern) = pattern else {
        tracing::error!(%channel, "notification received without a pattern subscription");
        return None;
    };

    if !patterns.contains(&pattern) {
        tracing::error!(%pattern, "keyspace notification received for unsubscribed pattern");
        return None;
    }

    Some(KeyspaceEvent {
        pattern,
        channel,
        operation: payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active() -> PatternSet {
        let mut set = PatternSet::new();
        set.insert("__keyspace@4__:PORT|*");
        set
    }

    #[test]
    fn test_accepts_subscribed_pattern() {
        let event = accept_message(
            &active(),
            Some("__keyspace@4__:PORT|*".to_string()),
            "__keyspace@4__:PORT|Ethernet0".to_string(),
            "hset".to_string(),
        )
        .unwrap();
        assert_eq!(event.operation, "hset");
        assert_eq!(event.table(), Some("PORT"));
    }

    #[test]
    fn test_drops_unsubscribed_pattern() {
        let event = accept_message(
            &active(),
            Some("__keyspace@4__:NTP|*".to_string()),
            "__keyspace@4__:NTP|global".to_string(),
            "hset".to_string(),
        );
        assert!(event.is_none());
    }

    #[test]
    fn test_drops_empty_payload_and_plain_messages() {
        let patterns = active();
        assert!(
            accept_message(
                &patterns,
                Some("__keyspace@4__:PORT|*".to_string()),
                "__keyspace@4__:PORT|Ethernet0".to_string(),
                String::new(),
            )
            .is_none()
        );
        assert!(
            accept_message(
                &patterns,
                None,
                "__keyspace@4__:PORT|Ethernet0".to_string(),
                "del".to_string(),
            )
            .is_none()
        );
    }

    #[test]
    fn test_pattern_set() {
        let mut set = PatternSet::new();
        assert!(set.is_empty());
        assert!(set.insert("b"));
        assert!(set.insert("a"));
        assert!(!set.insert("a"));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(set.remove("a"));
        assert!(!set.remove("a"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(SelectOutcome::Ready.to_string(), "OBJECT");
        assert_eq!(SelectOutcome::Timeout.to_string(), "TIMEOUT");
        assert_eq!(
            SelectOutcome::Error("boom".to_string()).to_string(),
            "ERROR (boom)"
        );
    }
}
