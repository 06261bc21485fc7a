//! GeoRoute Deterministic Simulation Harness
//!
//! Runs visualization sessions against a simulated decision engine on a
//! virtual clock, so feed outages, bad frames and visibility expiry can be
//! replayed exactly from a seed.
//!
//! # Architecture
//!
//! ```text
//!   SimContext ──now()──► Session ──outbox──► Decider
//!   (virtual clock,         ▲                    │
//!    seeded ids)            └──── replies ◄──────┘
//!                                (next step)
//!   Session ──snapshot──► SimFrame ──► SimExport (JSON)
//! ```
//!
//! `SimFeed` offers the same decider behind the async `FeedTransport`
//! interface, for driving `georoute_core::spawn_session` under a paused
//! tokio clock.
//!
//! # Usage
//!
//! ```ignore
//! use georoute_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let result = ScenarioRunner::new(42).run(ScenarioId::FeedOutage);
//! assert!(result.passed);
//! ```

mod context;
mod decider;
mod error;
mod exporter;
mod feed;
mod runner;
mod world;
pub mod scenarios;

pub use context::SimContext;
pub use decider::{Decider, DeciderMode};
pub use error::SimError;
pub use exporter::{SimExport, SimFrame};
pub use feed::{SimFeed, SimFeedController};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use world::{SimConfig, SimWorld};
