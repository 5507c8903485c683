//! Unified error types for the listing augmenter

use thiserror::Error;

/// Unified Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the listing augmenter
#[derive(Error, Debug)]
pub enum Error {
    /// The hosting context (runtime message channel) is gone for good
    #[error("Host context invalidated: {0}")]
    ContextInvalidated(String),

    /// Runtime message channel errors
    #[error("Channel error: {0}")]
    Channel(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Thumbnail fetch errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] reqwest::Error),

    /// Selector parse errors
    #[error("Invalid selector: {0}")]
    Selector(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new context invalidated error
    pub fn context_invalidated<S: Into<String>>(msg: S) -> Self {
        Error::ContextInvalidated(msg.into())
    }

    /// Create a new channel error
    pub fn channel<S: Into<String>>(msg: S) -> Self {
        Error::Channel(msg.into())
    }

    /// Create a new selector error
    pub fn selector<S: Into<String>>(msg: S) -> Self {
        Error::Selector(msg.into())
    }

    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Error::Configuration(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Error::Internal(msg.into())
    }

    /// Whether this error means the engine must tear down instead of retrying
    pub fn is_context_invalidated(&self) -> bool {
        matches!(self, Error::ContextInvalidated(_))
    }
}
