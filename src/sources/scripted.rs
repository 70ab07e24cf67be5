//! In-memory notification source driven by a script.

use super::notification_source::{NotificationSource, PatternSet, SelectOutcome, accept_message};
use crate::core::{CONFIG_DB_INDEX, KeyspaceEvent, channel_pattern, keyspace_prefix};
use crate::error::{Result, WatchError};
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::time::Duration;

/// One scripted reaction of a [`ScriptedSource`].
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Nothing arrives before the timeout.
    Timeout,
    /// The wait (or poll) fails.
    Error(String),
    /// These notifications arrive.
    Events(Vec<KeyspaceEvent>),
    /// A notification arrives that cannot be decoded.
    Malformed(String),
}

#[derive(Debug)]
enum Buffered {
    Event(KeyspaceEvent),
    Malformed(String),
}

/// A source that replays a fixed script instead of talking to a server.
///
/// Each call to [`select`](NotificationSource::select) or
/// [`poll`](NotificationSource::poll) consumes one step. Once the script is
/// exhausted the source behaves like an idle connection: `select` waits out
/// its timeout and reports [`SelectOutcome::Timeout`], `poll` finds nothing.
///
/// # Examples
///
/// ```rust
/// use keyspace_watcher::sources::{ScriptStep, ScriptedSource};
///
/// let source = ScriptedSource::new()
///     .then(ScriptStep::Timeout)
///     .then(ScriptStep::Events(vec![ScriptedSource::event("PORT", "Ethernet0", "hset")]));
/// assert_eq!(source.remaining_steps(), 2);
/// ```
#[derive(Debug, Default)]
pub struct ScriptedSource {
    script: VecDeque<ScriptStep>,
    buffer: VecDeque<Buffered>,
    patterns: PatternSet,
    subscribe_log: Vec<String>,
    unsubscribe_log: Vec<String>,
    rejected: HashSet<String>,
    select_calls: usize,
    poll_calls: usize,
}

impl ScriptedSource {
    /// Create a source with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step to the script.
    pub fn then(mut self, step: ScriptStep) -> Self {
        self.script.push_back(step);
        self
    }

    /// Make `psubscribe` fail for `pattern`.
    pub fn reject_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.rejected.insert(pattern.into());
        self
    }

    /// Build a `CONFIG_DB` notification for `table|key`.
    pub fn event(table: &str, key: &str, operation: &str) -> KeyspaceEvent {
        KeyspaceEvent::new(
            channel_pattern(CONFIG_DB_INDEX, table),
            format!("{}{}|{}", keyspace_prefix(CONFIG_DB_INDEX), table, key),
            operation,
        )
    }

    /// Every pattern passed to `psubscribe`, in call order, including rejected ones.
    pub fn subscribe_log(&self) -> &[String] {
        &self.subscribe_log
    }

    /// Every pattern passed to `punsubscribe`, in call order.
    pub fn unsubscribe_log(&self) -> &[String] {
        &self.unsubscribe_log
    }

    /// Number of `select` calls so far.
    pub fn select_calls(&self) -> usize {
        self.select_calls
    }

    /// Number of `poll` calls so far.
    pub fn poll_calls(&self) -> usize {
        self.poll_calls
    }

    /// Steps not yet consumed.
    pub fn remaining_steps(&self) -> usize {
        self.script.len()
    }

    fn buffer_step(&mut self, step: ScriptStep) {
        match step {
            ScriptStep::Events(events) => {
                self.buffer.extend(events.into_iter().map(Buffered::Event));
            }
            ScriptStep::Malformed(raw) => self.buffer.push_back(Buffered::Malformed(raw)),
            ScriptStep::Timeout | ScriptStep::Error(_) => {}
        }
    }
}

#[async_trait]
impl NotificationSource for ScriptedSource {
    async fn psubscribe(&mut self, pattern: &str) -> Result<()> {
        self.subscribe_log.push(pattern.to_string());
        if self.rejected.contains(pattern) {
            return Err(WatchError::subscribe(pattern, "rejected by script"));
        }
        self.patterns.insert(pattern);
        Ok(())
    }

    async fn punsubscribe(&mut self, pattern: &str) -> Result<()> {
        self.unsubscribe_log.push(pattern.to_string());
        self.patterns.remove(pattern);
        Ok(())
    }

    async fn select(&mut self, timeout: Duration) -> SelectOutcome {
        self.select_calls += 1;
        if self.has_data() {
            return SelectOutcome::Ready;
        }

        match self.script.pop_front() {
            None | Some(ScriptStep::Timeout) => {
                tokio::time::sleep(timeout).await;
                SelectOutcome::Timeout
            }
            Some(ScriptStep::Error(reason)) => SelectOutcome::Error(reason),
            Some(step) => {
                self.buffer_step(step);
                SelectOutcome::Ready
            }
        }
    }

    async fn poll(&mut self) -> Result<()> {
        self.poll_calls += 1;
        match self.script.pop_front() {
            Some(ScriptStep::Error(reason)) => Err(WatchError::ReceiveError(reason)),
            Some(step) => {
                self.buffer_step(step);
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn pops(&mut self) -> Result<Vec<KeyspaceEvent>> {
        let mut events = Vec::with_capacity(self.buffer.len());
        while let Some(entry) = self.buffer.pop_front() {
            match entry {
                Buffered::Event(event) => {
                    if let Some(event) = accept_message(
                        &self.patterns,
                        Some(event.pattern),
                        event.channel,
                        event.operation,
                    ) {
                        events.push(event);
                    }
                }
                // Hand out what was decoded first; the bad entry fails the next call.
                Buffered::Malformed(raw) if !events.is_empty() => {
                    self.buffer.push_front(Buffered::Malformed(raw));
                    break;
                }
                Buffered::Malformed(raw) => {
                    return Err(WatchError::ReceiveError(format!(
                        "cannot decode notification: {}",
                        raw
                    )));
                }
            }
        }
        Ok(events)
    }

    fn has_data(&self) -> bool {
        !self.buffer.is_empty()
    }

    fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    fn name(&self) -> String {
        "scripted".to_string()
    }
}
