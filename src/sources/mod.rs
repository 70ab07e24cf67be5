//! Notification source implementations.

mod notification_source;
mod scripted;

#[cfg(feature = "redis-source")]
mod redis;

pub use notification_source::{NotificationSource, PatternSet, SelectOutcome, accept_message};
pub use scripted::{ScriptStep, ScriptedSource};

#[cfg(feature = "redis-source")]
pub use self::redis::RedisKeyspaceSource;
