//! GeoRoute Core - Route Visualization State Engine
//!
//! Keeps a live picture of simulated client requests routed through a
//! two-tier network (edge PoPs backed by core origin data centers):
//! 1. **Feed**: resilient live connection with a fixed-delay reconnect loop
//! 2. **Ledger**: append-only routing decisions with a bounded visible lifetime
//! 3. **Projection**: geodesic user→edge→core paths derived from state at any instant
//!
//! The engine is sans-IO (`Session`); `runtime` drives it on tokio.

pub mod geo_math;
pub mod registry;
pub mod protocol;
pub mod connection;
pub mod ledger;
pub mod projector;
pub mod session;
pub mod runtime;
pub mod config;
pub mod error;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export key types for convenience
pub use geo_math::{geodesic_path, surface_distance_km, LatLng, EARTH_RADIUS_KM};
pub use registry::{Node, NodeRegistry, Tier};
pub use protocol::{FeedMessage, RoutingDecision, SimulatedUser, UserId};
pub use connection::{ConnectionManager, ConnectionState};
pub use ledger::{Route, RouteId, RouteLedger};
pub use projector::{PathRelation, RoutePath, Snapshot, SnapshotProjector, SnapshotStats};
pub use session::{Session, SessionCommand, SessionCounters};
pub use runtime::{spawn_session, SessionHandle};
pub use config::EngineConfig;
pub use error::{ConfigError, IngestError, ProtocolError, RegistryError};
