//! Route ledger: append-only history of accepted routing decisions.
//!
//! Routes are never mutated after ingestion. They leave the rendered picture
//! purely by ageing out of the visibility window (see `projector`); physical
//! removal only happens on `clear` or through opt-in retention pruning.

use crate::error::IngestError;
use crate::geo_math::LatLng;
use crate::protocol::{RoutingDecision, SimulatedUser, UserId};
use crate::registry::{Node, NodeRegistry};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Unique route identifier, assigned in ingestion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RouteId(pub u64);

impl std::fmt::Display for RouteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "route-{}", self.0)
    }
}

/// A time-bounded visual record of one routing decision.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub id: RouteId,
    pub user: SimulatedUser,

    /// Registry copy of the chosen edge node
    pub node: Node,

    pub distance_km: f64,

    /// Ingestion time on the session clock
    pub created_at: Duration,
}

impl Route {
    /// Time since ingestion (zero if `now` precedes it).
    pub fn age(&self, now: Duration) -> Duration {
        now.saturating_sub(self.created_at)
    }

    pub fn belongs_to(&self, user: &UserId) -> bool {
        &self.user.id == user
    }
}

/// Append-only route store validated against the node registry.
#[derive(Debug, Clone)]
pub struct RouteLedger {
    registry: Arc<NodeRegistry>,
    routes: Vec<Route>,

    /// Next id to hand out; never reused, even across `clear`
    next_id: u64,
}

impl RouteLedger {
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self {
            registry,
            routes: Vec::new(),
            next_id: 1,
        }
    }

    /// Validates and appends a routing decision.
    ///
    /// The decision must name a registered node whose tier is edge (and the
    /// decision itself must agree on the tier). Rejected decisions leave the
    /// ledger untouched.
    pub fn ingest(&mut self, decision: RoutingDecision, now: Duration) -> Result<RouteId, IngestError> {
        let node = self
            .registry
            .get(&decision.node.id)
            .ok_or_else(|| IngestError::UnknownNode(decision.node.id.clone()))?;
        if !node.is_edge() || !decision.node.is_edge() {
            return Err(IngestError::NotEdge(decision.node.id.clone()));
        }

        let id = RouteId(self.next_id);
        self.next_id += 1;
        self.routes.push(Route {
            id,
            user: decision.user,
            node: node.clone(),
            distance_km: decision.distance_km,
            created_at: now,
        });
        Ok(id)
    }

    /// Every stored route, in insertion order.
    pub fn all_routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn routes_for_user<'a>(&'a self, user: &'a UserId) -> impl Iterator<Item = &'a Route> + 'a {
        self.routes.iter().filter(move |r| r.belongs_to(user))
    }

    pub fn get(&self, id: RouteId) -> Option<&Route> {
        self.routes.iter().find(|r| r.id == id)
    }

    /// The secondary hop target of a route: the core nearest its edge node.
    pub fn nearest_core_for(&self, route: &Route) -> Option<&Node> {
        self.registry.nearest_core(route.node.position())
    }

    /// Nearest core to an arbitrary point.
    pub fn nearest_core(&self, point: LatLng) -> Option<&Node> {
        self.registry.nearest_core(point)
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Drops every route. The registry is unaffected.
    pub fn clear(&mut self) {
        self.routes.clear();
    }

    /// Physically removes routes older than `retention` whose user is not
    /// pinned. Returns how many were removed.
    pub fn prune<F>(&mut self, now: Duration, retention: Duration, is_pinned: F) -> usize
    where
        F: Fn(&UserId) -> bool,
    {
        let before = self.routes.len();
        self.routes
            .retain(|route| route.age(now) < retention || is_pinned(&route.user.id));
        before - self.routes.len()
    }
}
