//! Live-feed transport abstraction.

use async_trait::async_trait;
use crate::error::EnvError;
use crate::link::FeedLink;

/// Abstraction for opening the live feed that carries routing traffic.
///
/// # Implementations
///
/// - **Production**: `WsFeed` - WebSocket via tokio-tungstenite
/// - **Simulation**: `SimFeed` - in-process channels with fault injection
///
/// # Message Flow
///
/// ```text
/// Session                    FeedLink                 Decision engine
///   |                           |                          |
///   |-- send(SIMULATE_TRAFFIC) ->|------------------------->|
///   |                           |<-- ROUTING_DECISION -----|
///   |<-- recv() -> text --------|                          |
/// ```
#[async_trait]
pub trait FeedTransport: Send + Sync + 'static {
    /// Opens a new connection to the feed.
    ///
    /// # Returns
    /// * `Ok(link)` - The connection is open; text frames flow through `link`
    /// * `Err(EnvError)` - The attempt failed; the caller decides when to retry
    ///
    /// Each successful call yields an independent link. Dropping the link
    /// closes the underlying connection.
    async fn open(&self) -> Result<FeedLink, EnvError>;

    /// Human-readable endpoint description (for logging).
    fn endpoint(&self) -> String;
}
