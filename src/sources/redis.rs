//! Redis keyspace notification source.

use super::notification_source::{NotificationSource, PatternSet, SelectOutcome, accept_message};
use crate::core::KeyspaceEvent;
use crate::error::{Result, WatchError};
use async_trait::async_trait;
use futures::{FutureExt, Stream, StreamExt};
use redis::Msg;
use redis::aio::PubSubSink;
use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

/// Keyspace notifications read from a Redis pub/sub connection.
///
/// The connection is split into a command sink, used for (un)subscribing,
/// and a message stream. Messages are buffered as they are read; the server
/// does not replay them, so the buffer is only emptied by `pops`.
///
/// The server must have keyspace notifications enabled
/// (`notify-keyspace-events`), otherwise subscriptions succeed but nothing
/// is ever delivered.
///
/// # Examples
///
/// ```rust,no_run
/// use keyspace_watcher::sources::{NotificationSource, RedisKeyspaceSource};
///
/// # async fn example() -> keyspace_watcher::error::Result<()> {
/// let mut source = RedisKeyspaceSource::connect("redis://127.0.0.1:6379").await?;
/// source.psubscribe("__keyspace@4__:PORT|*").await?;
/// # Ok(())
/// # }
/// ```
pub struct RedisKeyspaceSource {
    addr: String,
    sink: PubSubSink,
    stream: Pin<Box<dyn Stream<Item = Msg> + Send>>,
    buffer: VecDeque<Msg>,
    patterns: PatternSet,
    closed: bool,
}

impl RedisKeyspaceSource {
    /// Open a dedicated pub/sub connection to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::ConnectionError`] if the URL is invalid or the
    /// server cannot be reached.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| WatchError::ConnectionError(format!("Invalid redis URL: {}", e)))?;
        let addr = client.get_connection_info().addr.to_string();

        let pubsub = client
            .get_async_pubsub()
            .await
            .map_err(|e| WatchError::ConnectionError(format!("{}: {}", addr, e)))?;
        let (sink, stream) = pubsub.split();

        tracing::info!(%addr, "connected to redis for keyspace notifications");

        Ok(Self {
            addr,
            sink,
            stream: Box::pin(stream),
            buffer: VecDeque::new(),
            patterns: PatternSet::new(),
            closed: false,
        })
    }

    /// Move every message the stream already holds into the buffer.
    fn drain_ready(&mut self) {
        while let Some(next) = self.stream.next().now_or_never() {
            match next {
                Some(msg) => self.buffer.push_back(msg),
                None => {
                    self.mark_closed();
                    break;
                }
            }
        }
    }

    fn mark_closed(&mut self) {
        if !self.closed {
            tracing::warn!(addr = %self.addr, "redis closed the notification stream");
            self.closed = true;
        }
    }

    fn decode(msg: &Msg) -> Result<(Option<String>, String, String)> {
        let pattern = if msg.from_pattern() {
            let pattern: String = msg.get_pattern().map_err(|e| {
                WatchError::ReceiveError(format!("Unreadable notification pattern: {}", e))
            })?;
            Some(pattern)
        } else {
            None
        };
        let payload: String = msg.get_payload().map_err(|e| {
            WatchError::ReceiveError(format!("Unreadable notification payload: {}", e))
        })?;

        Ok((pattern, msg.get_channel_name().to_string(), payload))
    }
}

#[async_trait]
impl NotificationSource for RedisKeyspaceSource {
    async fn psubscribe(&mut self, pattern: &str) -> Result<()> {
        self.sink
            .psubscribe(pattern)
            .await
            .map_err(|e| WatchError::subscribe(pattern, e))?;
        self.patterns.insert(pattern);
        Ok(())
    }

    async fn punsubscribe(&mut self, pattern: &str) -> Result<()> {
        self.sink
            .punsubscribe(pattern)
            .await
            .map_err(|e| WatchError::Other(format!("Failed to unsubscribe '{}': {}", pattern, e)))?;
        self.patterns.remove(pattern);
        Ok(())
    }

    async fn psubscribe_many(&mut self, patterns: &[String]) -> Result<()> {
        if patterns.is_empty() {
            return Ok(());
        }
        // A single PSUBSCRIBE carrying every pattern.
        self.sink
            .psubscribe(patterns)
            .await
            .map_err(|e| WatchError::subscribe(patterns.join(" "), e))?;
        for pattern in patterns {
            self.patterns.insert(pattern.as_str());
        }
        Ok(())
    }

    async fn punsubscribe_many(&mut self, patterns: &[String]) -> Result<()> {
        // An empty PUNSUBSCRIBE would drop every pattern.
        if patterns.is_empty() {
            return Ok(());
        }
        self.sink.punsubscribe(patterns).await.map_err(|e| {
            WatchError::Other(format!(
                "Failed to unsubscribe '{}': {}",
                patterns.join(" "),
                e
            ))
        })?;
        for pattern in patterns {
            self.patterns.remove(pattern);
        }
        Ok(())
    }

    async fn select(&mut self, timeout: Duration) -> SelectOutcome {
        if self.has_data() {
            return SelectOutcome::Ready;
        }
        if self.closed {
            return SelectOutcome::Error("notification stream closed".to_string());
        }

        match tokio::time::timeout(timeout, self.stream.next()).await {
            Ok(Some(msg)) => {
                self.buffer.push_back(msg);
                self.drain_ready();
                SelectOutcome::Ready
            }
            Ok(None) => {
                self.mark_closed();
                SelectOutcome::Error("notification stream closed".to_string())
            }
            Err(_) => SelectOutcome::Timeout,
        }
    }

    async fn poll(&mut self) -> Result<()> {
        if self.closed && self.buffer.is_empty() {
            return Err(WatchError::ConnectionClosed);
        }
        self.drain_ready();
        Ok(())
    }

    fn pops(&mut self) -> Result<Vec<KeyspaceEvent>> {
        let mut events = Vec::with_capacity(self.buffer.len());
        while let Some(msg) = self.buffer.pop_front() {
            let (pattern, channel, payload) = match Self::decode(&msg) {
                Ok(decoded) => decoded,
                Err(_) if !events.is_empty() => {
                    self.buffer.push_front(msg);
                    break;
                }
                Err(e) => return Err(e),
            };
            if let Some(event) = accept_message(&self.patterns, pattern, channel, payload) {
                events.push(event);
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
        format!("redis:{}", self.addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_url() {
        let result = RedisKeyspaceSource::connect("not a url").await;
        assert!(matches!(result, Err(WatchError::ConnectionError(_))));
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        // Port 1 is reserved and refuses connections.
        let result = RedisKeyspaceSource::connect("redis://127.0.0.1:1").await;
        assert!(matches!(result, Err(WatchError::ConnectionError(_))));
    }
}
