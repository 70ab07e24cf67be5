//! Watcher settings and the layers they are loaded from.
//!
//! The watcher takes no command line flags. Built-in defaults reproduce the
//! fixed behaviour (ten tables in `CONFIG_DB`, 2 s select timeout); an
//! optional settings file and `KEYSPACE_WATCHER_*` environment variables can
//! override individual keys.

mod builder;
mod env;
mod file;
mod layer;
mod loader;

pub use builder::SettingsBuilder;
pub use env::EnvLayer;
pub use file::FileLayer;
pub use layer::SettingsLayer;
pub use loader::SettingsLoader;

use crate::core::{CONFIG_DB_INDEX, KEY_SEPARATOR, Validate, default_tables};
use crate::error::ValidationError;
use crate::notify::PollStrategy;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

/// Prefix of the environment variables read by [`SettingsBuilder::from_env`].
pub const ENV_PREFIX: &str = "KEYSPACE_WATCHER";

/// Environment variable naming an optional settings file.
pub const CONFIG_PATH_ENV: &str = "KEYSPACE_WATCHER_CONFIG";

/// Where notifications come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// A Redis server at `redis_url`.
    #[default]
    Redis,
    /// No server: subscriptions succeed and nothing ever arrives.
    DryRun,
}

/// How the watcher waits for the next batch of events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Block on the source with a timeout.
    #[default]
    Select,
    /// Sleep a fixed interval, then poll the source.
    Poll,
}

/// Settings for a keyspace watcher.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WatcherSettings {
    /// Notification backend.
    pub source: SourceKind,
    /// Connection URL of the notification backend.
    pub redis_url: String,
    /// Database index the keyspace patterns refer to.
    pub db_index: u32,
    /// Tables to watch, in subscription order.
    pub tables: Vec<String>,
    /// Wait strategy.
    pub strategy: StrategyKind,
    /// Timeout of one blocking wait, in milliseconds.
    pub select_timeout_ms: u64,
    /// Sleep between two polls, in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            source: SourceKind::Redis,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            db_index: CONFIG_DB_INDEX,
            tables: default_tables(),
            strategy: StrategyKind::Select,
            select_timeout_ms: 2000,
            poll_interval_ms: 1000,
        }
    }
}

impl WatcherSettings {
    /// The wait strategy described by these settings.
    pub fn poll_strategy(&self) -> PollStrategy {
        match self.strategy {
            StrategyKind::Select => {
                PollStrategy::blocking_wait(Duration::from_millis(self.select_timeout_ms))
            }
            StrategyKind::Poll => {
                PollStrategy::fixed_interval(Duration::from_millis(self.poll_interval_ms))
            }
        }
    }
}

impl Validate for WatcherSettings {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = Vec::new();

        if self.source == SourceKind::Redis && self.redis_url.trim().is_empty() {
            errors.push(ValidationError::invalid_field("redis_url", "must not be empty"));
        }

        if self.tables.is_empty() {
            errors.push(ValidationError::invalid_field("tables", "must list at least one table"));
        }

        let mut seen = HashSet::new();
        for table in &self.tables {
            if table.is_empty() {
                errors.push(ValidationError::invalid_field("tables", "contains an empty name"));
            } else if table
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, '*' | '?' | '[' | ']') || c == KEY_SEPARATOR)
            {
                errors.push(ValidationError::invalid_field(
                    "tables",
                    format!("'{}' contains whitespace or pattern characters", table),
                ));
            }
            if !seen.insert(table.as_str()) {
                errors.push(ValidationError::invalid_field(
                    "tables",
                    format!("'{}' is listed more than once", table),
                ));
            }
        }

        if self.select_timeout_ms == 0 {
            errors.push(ValidationError::invalid_field("select_timeout_ms", "must be greater than 0"));
        }
        if self.poll_interval_ms == 0 {
            errors.push(ValidationError::invalid_field("poll_interval_ms", "must be greater than 0"));
        }

        match ValidationError::from_list(errors) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = WatcherSettings::default();
        assert_eq!(settings.db_index, 4);
        assert_eq!(settings.tables.len(), 10);
        assert_eq!(settings.strategy, StrategyKind::Select);
        assert_eq!(settings.source, SourceKind::Redis);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_poll_strategy() {
        let mut settings = WatcherSettings::default();
        assert_eq!(
            settings.poll_strategy(),
            PollStrategy::BlockingWait {
                timeout: Duration::from_millis(2000)
            }
        );

        settings.strategy = StrategyKind::Poll;
        assert_eq!(
            settings.poll_strategy(),
            PollStrategy::FixedInterval {
                interval: Duration::from_secs(1)
            }
        );
    }

    #[test]
    fn test_dry_run_needs_no_url() {
        let settings = WatcherSettings {
            source: SourceKind::DryRun,
            redis_url: String::new(),
            ..WatcherSettings::default()
        };
        assert!(settings.validate().is_ok());

        let settings = WatcherSettings {
            redis_url: String::new(),
            ..WatcherSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_rejects_duplicate_tables() {
        let settings = WatcherSettings {
            tables: vec!["PORT".to_string(), "NTP".to_string(), "PORT".to_string()],
            ..WatcherSettings::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_rejects_pattern_characters() {
        for bad in ["PO RT", "PORT*", "PORT|x", "[AB]"] {
            let settings = WatcherSettings {
                tables: vec![bad.to_string()],
                ..WatcherSettings::default()
            };
            assert!(settings.validate().is_err(), "{bad}");
        }
    }

    #[test]
    fn test_collects_every_problem() {
        let settings = WatcherSettings {
            redis_url: " ".to_string(),
            tables: Vec::new(),
            select_timeout_ms: 0,
            ..WatcherSettings::default()
        };
        match settings.validate().unwrap_err() {
            ValidationError::Multiple(errors) => assert_eq!(errors.len(), 3),
            other => panic!("expected multiple errors, got {other:?}"),
        }
    }
}
