//! Watched configuration tables and their keyspace channel patterns.

/// Logical database holding the configuration tables (`CONFIG_DB`).
pub const CONFIG_DB_INDEX: u32 = 4;

/// Tables watched when no explicit list is configured.
///
/// FEATURE is listed before the AAA/TACACS tables so its notifications are
/// registered early; the order carries no delivery guarantee.
pub const DEFAULT_TABLES: [&str; 10] = [
    "KDUMP",
    "FEATURE",
    "AAA",
    "TACPLUS_SERVER",
    "TACPLUS",
    "LOOPBACK_INTERFACE",
    "NTP_SERVER",
    "NTP",
    "AUTO_TECHSUPPORT",
    "PORT",
];

/// Separator between a table name and the rest of a key.
pub const KEY_SEPARATOR: char = '|';

/// Prefix of every keyspace channel for database `db_index`.
///
/// # Examples
///
/// ```rust
/// use keyspace_watcher::core::keyspace_prefix;
///
/// assert_eq!(keyspace_prefix(4), "__keyspace@4__:");
/// ```
pub fn keyspace_prefix(db_index: u32) -> String {
    format!("__keyspace@{}__:", db_index)
}

/// Channel pattern matching every key of `table` in database `db_index`.
///
/// # Examples
///
/// ```rust
/// use keyspace_watcher::core::channel_pattern;
///
/// assert_eq!(channel_pattern(4, "PORT"), "__keyspace@4__:PORT|*");
/// ```
pub fn channel_pattern(db_index: u32, table: &str) -> String {
    format!("{}{}{}*", keyspace_prefix(db_index), table, KEY_SEPARATOR)
}

/// The default table list as owned strings.
pub fn default_tables() -> Vec<String> {
    DEFAULT_TABLES.iter().map(|t| t.to_string()).collect()
}
