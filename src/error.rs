//! Error types for keyspace-watcher.

use std::fmt;

/// Result type alias for keyspace-watcher operations.
pub type Result<T> = std::result::Result<T, WatchError>;

/// Errors that can occur while configuring or running a watcher.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Failed to connect to the notification backend.
    #[error("Failed to connect to notification source: {0}")]
    ConnectionError(String),

    /// Registering a pattern subscription failed.
    #[error("Failed to subscribe to '{pattern}': {reason}")]
    SubscribeError {
        /// The channel pattern that was rejected
        pattern: String,
        /// Why the backend rejected it
        reason: String,
    },

    /// Reading or decoding pending notifications failed.
    #[error("Failed to receive notifications: {0}")]
    ReceiveError(String),

    /// The backend closed the subscription stream.
    #[error("Notification stream closed by the server")]
    ConnectionClosed,

    /// Failed to load settings from a source.
    #[error("Failed to load settings: {0}")]
    LoadError(String),

    /// Failed to deserialize settings.
    #[error("Failed to deserialize settings: {0}")]
    DeserializationError(String),

    /// Settings validation failed.
    #[error("Settings validation failed: {0}")]
    ValidationError(String),

    /// IO error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic error for other cases.
    #[error("Watcher error: {0}")]
    Other(String),
}

impl WatchError {
    /// Create a subscription error for `pattern`.
    pub fn subscribe(pattern: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::SubscribeError {
            pattern: pattern.into(),
            reason: reason.to_string(),
        }
    }
}

/// Validation error for watcher settings.
#[derive(Debug)]
pub enum ValidationError {
    /// Custom validation error with a message.
    Custom(String),

    /// A specific field has an invalid value.
    InvalidField {
        /// The field name/path
        field: String,
        /// The reason why it's invalid
        reason: String,
    },

    /// Multiple validation errors occurred.
    Multiple(Vec<ValidationError>),
}

impl ValidationError {
    /// Create a custom validation error.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    /// Create an invalid field error.
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Collapse a list of errors: `None` when empty, the single error when
    /// there is one, `Multiple` otherwise.
    pub fn from_list(mut errors: Vec<ValidationError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Multiple(errors)),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(msg) => write!(f, "{}", msg),
            Self::InvalidField { field, reason } => {
                write!(f, "Field '{}' is invalid: {}", field, reason)
            }
            Self::Multiple(errors) => {
                writeln!(f, "Multiple validation errors:")?;
                for (i, err) in errors.iter().enumerate() {
                    writeln!(f, "  {}. {}", i + 1, err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for WatchError {
    fn from(err: ValidationError) -> Self {
        WatchError::ValidationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_error_message() {
        let err = WatchError::subscribe("__keyspace@4__:PORT|*", "connection reset");
        assert_eq!(
            err.to_string(),
            "Failed to subscribe to '__keyspace@4__:PORT|*': connection reset"
        );
    }

    #[test]
    fn test_from_list() {
        assert!(ValidationError::from_list(Vec::new()).is_none());

        let single = ValidationError::from_list(vec![ValidationError::custom("a")]).unwrap();
        assert!(matches!(single, ValidationError::Custom(_)));

        let many = ValidationError::from_list(vec![
            ValidationError::custom("a"),
            ValidationError::invalid_field("tables", "empty"),
        ])
        .unwrap();
        let text = many.to_string();
        assert!(text.contains("1. a"));
        assert!(text.contains("2. Field 'tables' is invalid: empty"));
    }

    #[test]
    fn test_validation_converts_to_watch_error() {
        let err: WatchError = ValidationError::invalid_field("db_index", "too large").into();
        assert!(matches!(err, WatchError::ValidationError(_)));
    }
}
