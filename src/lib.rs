//! # keyspace-watcher
//!
//! Watch Redis keyspace notifications for configuration tables and report
//! every change.
//!
//! ## Overview
//!
//! A watcher subscribes to one pattern per table,
//! `__keyspace@<db>__:<TABLE>|*`, then loops forever draining the
//! notifications that arrive and handing each to its subscribers. It stops
//! only when a shutdown is requested, normally by SIGINT or SIGTERM.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use keyspace_watcher::prelude::*;
//!
//! # async fn example() -> keyspace_watcher::error::Result<()> {
//! let settings = SettingsBuilder::from_env().build()?;
//! let source = RedisKeyspaceSource::connect(&settings.redis_url).await?;
//!
//! let mut watcher = KeyspaceWatcher::from_settings(source, &settings);
//! watcher.subscribe_all().await?;
//! watcher.subscribe(|event| println!("{}", event));
//!
//! let (controller, shutdown) = shutdown_channel();
//! let _listener = spawn_signal_listener(controller)?;
//! let request = watcher.run(shutdown).await;
//! std::process::exit(request.exit_code);
//! # }
//! ```
//!
//! ## Wait strategies
//!
//! - **Blocking wait**: block on the source with a timeout (2 s by default).
//! - **Fixed interval**: sleep (1 s by default), then poll the source.
//!
//! Timeouts and wait failures are logged and the loop continues.
//!
//! ## Feature Flags
//!
//! - `redis-source` (default): the Redis backend and the `keyspace-watcher` binary.

#![warn(missing_docs, rust_2024_compatibility)]
#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod notify;
pub mod settings;
pub mod sources;

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::core::{KeyspaceEvent, Validate, channel_pattern};
    pub use crate::error::{Result, ValidationError, WatchError};
    pub use crate::notify::{
        KeyspaceWatcher, PollStrategy, ShutdownRequest, ShutdownSignal, shutdown_channel,
        spawn_signal_listener,
    };
    pub use crate::settings::{SettingsBuilder, WatcherSettings};
    pub use crate::sources::{NotificationSource, ScriptedSource};

    #[cfg(feature = "redis-source")]
    pub use crate::sources::RedisKeyspaceSource;
}
