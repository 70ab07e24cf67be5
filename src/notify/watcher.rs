//! The keyspace watcher loop.

use super::signals::{ShutdownRequest, ShutdownSignal};
use super::strategy::PollStrategy;
use super::subscriber::{SubscriberId, SubscriberRegistry};
use crate::core::{CONFIG_DB_INDEX, KeyspaceEvent, channel_pattern, default_tables};
use crate::error::Result;
use crate::settings::WatcherSettings;
use crate::sources::{NotificationSource, SelectOutcome};

/// Outcome of one wait on the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Batch {
    /// Events drained from the source, in arrival order. May be empty when
    /// everything read was filtered out.
    Events(Vec<KeyspaceEvent>),
    /// Nothing arrived within the wait.
    Timeout,
    /// The wait or poll failed; the next iteration retries.
    ///
    /// A failed blocking wait is only reported once its timeout has elapsed,
    /// so a source that keeps failing cannot spin the loop.
    Failed(String),
}

/// Counters kept across loop iterations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatcherStats {
    /// Completed loop iterations.
    pub iterations: u64,
    /// Iterations that ended in a timeout.
    pub timeouts: u64,
    /// Iterations that ended in a wait, poll or drain failure.
    pub failures: u64,
    /// Events dispatched to subscribers.
    pub events: u64,
}

/// Subscribes to keyspace notifications for a list of tables and dispatches
/// every event it receives until shut down.
///
/// # Examples
///
/// ```rust
/// use keyspace_watcher::notify::{KeyspaceWatcher, PollStrategy};
/// use keyspace_watcher::sources::{ScriptStep, ScriptedSource};
///
/// # async fn example() -> keyspace_watcher::error::Result<()> {
/// let source = ScriptedSource::new()
///     .then(ScriptStep::Events(vec![ScriptedSource::event("PORT", "Ethernet0", "hset")]));
/// let mut watcher = KeyspaceWatcher::new(source, PollStrategy::default());
/// watcher.subscribe_all().await?;
///
/// watcher.subscribe(|event| println!("{}", event));
/// assert_eq!(watcher.tick().await, 1);
/// # Ok(())
/// # }
/// ```
pub struct KeyspaceWatcher<S> {
    source: S,
    tables: Vec<String>,
    db_index: u32,
    strategy: PollStrategy,
    subscribers: SubscriberRegistry,
    stats: WatcherStats,
}

impl<S: NotificationSource> KeyspaceWatcher<S> {
    /// Watch the default tables of `CONFIG_DB` on `source`.
    pub fn new(source: S, strategy: PollStrategy) -> Self {
        Self {
            source,
            tables: default_tables(),
            db_index: CONFIG_DB_INDEX,
            strategy,
            subscribers: SubscriberRegistry::new(),
            stats: WatcherStats::default(),
        }
    }

    /// Build a watcher configured from `settings`.
    pub fn from_settings(source: S, settings: &WatcherSettings) -> Self {
        Self::new(source, settings.poll_strategy())
            .with_tables(settings.tables.iter().cloned())
            .with_db_index(settings.db_index)
    }

    /// Replace the watched tables.
    pub fn with_tables<I, T>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tables = tables.into_iter().map(Into::into).collect();
        self
    }

    /// Watch keyspace events of another database.
    pub fn with_db_index(mut self, db_index: u32) -> Self {
        self.db_index = db_index;
        self
    }

    /// Channel patterns for the watched tables, in table order.
    pub fn patterns(&self) -> Vec<String> {
        self.tables
            .iter()
            .map(|table| channel_pattern(self.db_index, table))
            .collect()
    }

    /// Register one pattern subscription per watched table.
    ///
    /// Returns the registered patterns.
    ///
    /// # Errors
    ///
    /// Returns the source's error if any registration fails. Startup should
    /// not continue with a partial subscription set.
    pub async fn subscribe_all(&mut self) -> Result<Vec<String>> {
        let patterns = self.patterns();
        self.source.psubscribe_many(&patterns).await?;
        for pattern in &patterns {
            tracing::info!(%pattern, "subscribed");
        }
        Ok(patterns)
    }

    /// Register a callback receiving every dispatched event.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriberId
    where
        F: FnMut(&KeyspaceEvent) + Send + 'static,
    {
        self.subscribers.subscribe(callback)
    }

    /// Remove a callback registered with [`subscribe`](Self::subscribe).
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// Wait for the next batch of events using the configured strategy.
    ///
    /// Wait and poll failures are reported as [`Batch::Failed`].
    ///
    /// # Errors
    ///
    /// Returns an error if buffered notifications cannot be drained.
    pub async fn next_batch(&mut self) -> Result<Batch> {
        match self.strategy {
            PollStrategy::BlockingWait { timeout } => {
                let deadline = tokio::time::Instant::now() + timeout;
                match self.source.select(timeout).await {
                    SelectOutcome::Timeout => Ok(Batch::Timeout),
                    SelectOutcome::Error(reason) => {
                        tokio::time::sleep_until(deadline).await;
                        Ok(Batch::Failed(reason))
                    }
                    SelectOutcome::Ready => Ok(Batch::Events(self.source.pops()?)),
                }
            }
            PollStrategy::FixedInterval { interval } => {
                tokio::time::sleep(interval).await;
                if let Err(e) = self.source.poll().await {
                    return Ok(Batch::Failed(e.to_string()));
                }
                Ok(Batch::Events(self.source.pops()?))
            }
        }
    }

    /// Run one loop iteration and return the number of events dispatched.
    ///
    /// Never fails: timeouts and failures are logged and counted.
    pub async fn tick(&mut self) -> usize {
        self.stats.iterations += 1;

        match self.next_batch().await {
            Ok(Batch::Events(events)) => {
                for event in &events {
                    tracing::debug!(channel = %event.channel, operation = %event.operation, "keyspace event");
                    self.subscribers.notify_all(event);
                }
                self.stats.events += events.len() as u64;
                events.len()
            }
            Ok(Batch::Timeout) => {
                self.stats.timeouts += 1;
                tracing::debug!("select timed out, no events");
                0
            }
            Ok(Batch::Failed(reason)) => {
                self.stats.failures += 1;
                tracing::error!(source = %self.source.name(), %reason, "error returned by select");
                0
            }
            Err(e) => {
                self.stats.failures += 1;
                tracing::error!(source = %self.source.name(), error = %e, "failed to drain notifications");
                0
            }
        }
    }

    /// Loop until `shutdown` fires, then return the request that stopped it.
    ///
    /// A pending wait or sleep is abandoned as soon as shutdown is requested.
    pub async fn run(&mut self, mut shutdown: ShutdownSignal) -> ShutdownRequest {
        tracing::info!(
            source = %self.source.name(),
            strategy = ?self.strategy,
            tables = self.tables.len(),
            "watching keyspace notifications"
        );

        loop {
            let stop = tokio::select! {
                biased;
                request = shutdown.requested() => Some(request),
                _ = self.tick() => None,
            };

            if let Some(request) = stop {
                tracing::info!(
                    signal = request.signal,
                    exit_code = request.exit_code,
                    iterations = self.stats.iterations,
                    events = self.stats.events,
                    timeouts = self.stats.timeouts,
                    failures = self.stats.failures,
                    "watcher stopped"
                );
                return request;
            }
        }
    }

    /// Counters since construction.
    pub fn stats(&self) -> WatcherStats {
        self.stats
    }

    /// The configured wait strategy.
    pub fn strategy(&self) -> PollStrategy {
        self.strategy
    }

    /// The watched tables.
    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    /// The underlying source.
    pub fn source(&self) -> &S {
        &self.source
    }
}
