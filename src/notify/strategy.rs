//! How a watcher waits for its next batch of events.

use std::time::Duration;

/// Wait strategy of a [`KeyspaceWatcher`](super::KeyspaceWatcher).
///
/// Both strategies deliver every notification with a latency bounded by
/// their duration; they differ in how the source is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStrategy {
    /// Block on the source until data arrives or `timeout` elapses.
    BlockingWait {
        /// Upper bound of one wait.
        timeout: Duration,
    },
    /// Sleep `interval`, then pull whatever the source has pending.
    FixedInterval {
        /// Sleep between two polls.
        interval: Duration,
    },
}

impl PollStrategy {
    /// Default timeout of the blocking strategy.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);

    /// Default interval of the polling strategy.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

    /// Blocking wait with the given timeout.
    pub fn blocking_wait(timeout: Duration) -> Self {
        Self::BlockingWait { timeout }
    }

    /// Fixed-interval polling.
    pub fn fixed_interval(interval: Duration) -> Self {
        Self::FixedInterval { interval }
    }

    /// Longest time an available event can wait before it is drained.
    pub fn latency_bound(&self) -> Duration {
        match self {
            Self::BlockingWait { timeout } => *timeout,
            Self::FixedInterval { interval } => *interval,
        }
    }
}

impl Default for PollStrategy {
    fn default() -> Self {
        Self::blocking_wait(Self::DEFAULT_TIMEOUT)
    }
}
