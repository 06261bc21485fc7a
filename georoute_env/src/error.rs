//! Error types for the GeoRoute environment abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Opening or using the live feed failed (refused, reset, handshake error)
    #[error("Feed error: {0}")]
    FeedError(String),

    /// The other end of the feed link is gone
    #[error("Feed link closed")]
    Closed,

    /// Feed endpoint could not be parsed or uses an unsupported scheme
    #[error("Invalid feed url: {0}")]
    InvalidUrl(String),
}

impl EnvError {
    /// Creates a feed error.
    pub fn feed(msg: impl Into<String>) -> Self {
        Self::FeedError(msg.into())
    }

    /// Creates an invalid url error.
    pub fn invalid_url(msg: impl std::fmt::Display) -> Self {
        Self::InvalidUrl(msg.to_string())
    }
}
