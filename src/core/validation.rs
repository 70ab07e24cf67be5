//! Settings validation support.

use crate::error::ValidationError;

/// Trait for settings validation.
///
/// Implemented by settings types so that invalid values are rejected before
/// a watcher is constructed from them.
///
/// # Examples
///
/// ```rust
/// use keyspace_watcher::core::Validate;
/// use keyspace_watcher::error::ValidationError;
///
/// struct Limits {
///     timeout_ms: u64,
/// }
///
/// impl Validate for Limits {
///     fn validate(&self) -> Result<(), ValidationError> {
///         if self.timeout_ms == 0 {
///             return Err(ValidationError::invalid_field(
///                 "timeout_ms",
///                 "must be greater than 0"
///             ));
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Validate {
    /// Validate the settings.
    ///
    /// # Errors
    ///
    /// Should return a `ValidationError` describing what validation failed.
    fn validate(&self) -> Result<(), ValidationError>;
}
