//! Error types used by the event bus.
//!
//! Only subscription configuration can fail synchronously; publishing never
//! errors (zero subscribers, unknown topics and panicking filters are all
//! absorbed by the dispatch path). See [`ConfigError`].

use thiserror::Error;

/// # Errors produced by subscription configuration.
///
/// Returned by the subscribe operations when a [`SubscribeConfig`] cannot be
/// honored. Negative sizes and durations are unrepresentable (`usize`,
/// `Duration`), so the remaining invalid shape is an empty replay buffer.
///
/// [`SubscribeConfig`]: crate::SubscribeConfig
#[non_exhaustive]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Replay was requested with `buffer_size == 0`; a replay buffer must
    /// retain at least one envelope.
    #[error("replay buffer size must be at least 1")]
    ZeroBufferSize,
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use backplane::ConfigError;
    ///
    /// assert_eq!(ConfigError::ZeroBufferSize.as_label(), "zero_buffer_size");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::ZeroBufferSize => "zero_buffer_size",
        }
    }
}
