//! Core watcher types: tables, channel patterns and events.

mod event;
mod tables;
mod validation;

pub use event::KeyspaceEvent;
pub use tables::{
    CONFIG_DB_INDEX, DEFAULT_TABLES, KEY_SEPARATOR, channel_pattern, default_tables,
    keyspace_prefix,
};
pub use validation::Validate;
