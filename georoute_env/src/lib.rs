//! GeoRoute Environment Abstraction Layer
//!
//! This crate provides the "Sans-IO" boundary that lets the route
//! visualization engine run against a **live feed** (tokio + WebSocket) or
//! inside a **simulation** (virtual clock + in-process feed).
//!
//! # Core Concept: The Reactor Pattern
//!
//! Every source of non-determinism the engine touches is intercepted here:
//! - Time (`now()`, `sleep()`)
//! - The live feed (`open()`, `FeedLink::send()`, `FeedLink::recv()`)
//! - Identifier generation (`generate_id()`)
//!
//! # Example
//!
//! ```ignore
//! use georoute_env::{RouteContext, FeedTransport};
//!
//! async fn feed_loop<Ctx: RouteContext, T: FeedTransport>(ctx: &Ctx, feed: &T) {
//!     let mut link = feed.open().await?;
//!     loop {
//!         tokio::select! {
//!             msg = link.recv() => handle(msg),
//!             _ = ctx.sleep(Duration::from_secs(1)) => tick(),
//!         }
//!     }
//! }
//! ```

mod context;
mod transport;
mod link;
mod error;
mod tokio_impl;
mod ws_impl;

pub use context::RouteContext;
pub use transport::FeedTransport;
pub use link::{FeedLink, FeedPeer};
pub use error::EnvError;
pub use tokio_impl::TokioContext;
pub use ws_impl::WsFeed;
