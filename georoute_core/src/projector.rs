//! Snapshot projection: the renderable path set at a given instant.
//!
//! Projection is a pure function of `(routes, now, hovered user)` plus the
//! static registry and configuration. Visibility depends on elapsed time,
//! so the projection must be re-evaluated periodically even when no event
//! arrives; the session's tick does that.

use crate::config::EngineConfig;
use crate::connection::ConnectionState;
use crate::geo_math::{geodesic_path, LatLng};
use crate::ledger::{Route, RouteId};
use crate::protocol::{SimulatedUser, UserId};
use crate::registry::{NodeRegistry, Tier};
use serde::Serialize;
use serde_json::json;
use std::time::Duration;

/// Which hop of a route a path draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PathRelation {
    /// Simulated user to the edge PoP serving it
    UserToEdge,
    /// Edge PoP to its nearest core data center
    EdgeToCore,
}

impl PathRelation {
    pub fn as_str(&self) -> &'static str {
        match self {
            PathRelation::UserToEdge => "user-to-edge",
            PathRelation::EdgeToCore => "edge-to-core",
        }
    }
}

/// One tagged geodesic line handed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutePath {
    /// Render key: `route-N` for the user hop, `route-N-core` for the core hop
    pub id: String,
    pub route_id: RouteId,
    pub relation: PathRelation,
    pub waypoints: Vec<LatLng>,
}

/// Counters shown alongside the map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotStats {
    pub core_nodes: usize,
    pub edge_nodes: usize,
    pub users: usize,
    pub visible_routes: usize,
    pub total_routes: usize,
}

/// Everything the renderer needs to draw one frame (nodes come from the
/// registry, which never changes).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Session clock at projection time, in milliseconds
    pub at_ms: u64,
    pub tick: u64,
    pub connection: ConnectionState,
    pub hovered: Option<UserId>,
    pub users: Vec<SimulatedUser>,
    pub paths: Vec<RoutePath>,
    pub stats: SnapshotStats,
}

impl Snapshot {
    /// Snapshot of a session that has not started.
    pub fn empty() -> Self {
        Self {
            at_ms: 0,
            tick: 0,
            connection: ConnectionState::Disconnected,
            hovered: None,
            users: Vec::new(),
            paths: Vec::new(),
            stats: SnapshotStats::default(),
        }
    }

    pub fn paths_of(&self, relation: PathRelation) -> impl Iterator<Item = &RoutePath> + '_ {
        self.paths.iter().filter(move |p| p.relation == relation)
    }

    /// The paths as a GeoJSON `FeatureCollection` of `LineString`s.
    ///
    /// Coordinates are `[lng, lat]`; each feature carries `{id, type}`
    /// properties where `type` is the path relation.
    pub fn feature_collection(&self) -> serde_json::Value {
        let features: Vec<serde_json::Value> = self
            .paths
            .iter()
            .map(|path| {
                let coordinates: Vec<[f64; 2]> =
                    path.waypoints.iter().map(|p| [p.lng, p.lat]).collect();
                json!({
                    "type": "Feature",
                    "properties": { "id": path.id, "type": path.relation.as_str() },
                    "geometry": { "type": "LineString", "coordinates": coordinates },
                })
            })
            .collect();

        json!({ "type": "FeatureCollection", "features": features })
    }
}

/// Derives renderable paths from ledger state.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotProjector<'a> {
    registry: &'a NodeRegistry,
    window: Duration,
    path_points: usize,
}

impl<'a> SnapshotProjector<'a> {
    pub fn new(registry: &'a NodeRegistry, config: &EngineConfig) -> Self {
        Self {
            registry,
            window: config.visibility_window,
            path_points: config.path_points,
        }
    }

    /// A route is visible while younger than the window, or while its user
    /// is hovered.
    pub fn is_visible(&self, route: &Route, now: Duration, hovered: Option<&UserId>) -> bool {
        route.age(now) < self.window || hovered.is_some_and(|user| route.belongs_to(user))
    }

    /// Paths for every visible route, in route insertion order.
    ///
    /// Each route yields its user→edge path, followed by an edge→core path
    /// when the registry has a core node.
    pub fn project(&self, routes: &[Route], now: Duration, hovered: Option<&UserId>) -> Vec<RoutePath> {
        let mut paths = Vec::new();

        for route in routes.iter().filter(|r| self.is_visible(r, now, hovered)) {
            let edge = route.node.position();
            paths.push(RoutePath {
                id: route.id.to_string(),
                route_id: route.id,
                relation: PathRelation::UserToEdge,
                waypoints: geodesic_path(route.user.position(), edge, self.path_points),
            });

            if let Some(core) = self.registry.nearest_core(edge) {
                paths.push(RoutePath {
                    id: format!("{}-core", route.id),
                    route_id: route.id,
                    relation: PathRelation::EdgeToCore,
                    waypoints: geodesic_path(edge, core.position(), self.path_points),
                });
            }
        }

        paths
    }

    /// Number of routes visible at `now`.
    pub fn visible_count(&self, routes: &[Route], now: Duration, hovered: Option<&UserId>) -> usize {
        routes.iter().filter(|r| self.is_visible(r, now, hovered)).count()
    }

    /// Full frame for the renderer.
    pub fn snapshot(
        &self,
        routes: &[Route],
        users: &[SimulatedUser],
        connection: ConnectionState,
        now: Duration,
        tick: u64,
        hovered: Option<&UserId>,
    ) -> Snapshot {
        let paths = self.project(routes, now, hovered);
        let stats = SnapshotStats {
            core_nodes: self.registry.count(Tier::Core),
            edge_nodes: self.registry.count(Tier::Edge),
            users: users.len(),
            visible_routes: self.visible_count(routes, now, hovered),
            total_routes: routes.len(),
        };

        Snapshot {
            at_ms: now.as_millis() as u64,
            tick,
            connection,
            hovered: hovered.cloned(),
            users: users.to_vec(),
            paths,
            stats,
        }
    }
}
