//! The watcher loop, its wait strategies, event dispatch and signal handling.

pub mod signals;
pub mod strategy;
pub mod subscriber;
pub mod watcher;

pub use signals::{
    ShutdownController, ShutdownRequest, ShutdownSignal, SignalAction, disposition,
    shutdown_channel, spawn_signal_listener,
};
pub use strategy::PollStrategy;
pub use subscriber::{SubscriberId, SubscriberRegistry};
pub use watcher::{Batch, KeyspaceWatcher, WatcherStats};
