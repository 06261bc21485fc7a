//! Scenario runner - executes deterministic session scenarios.

use crate::decider::DeciderMode;
use crate::error::SimError;
use crate::exporter::{SimExport, SimFrame};
use crate::scenarios::ScenarioId;
use crate::world::{SimConfig, SimWorld};

use georoute_core::{
    surface_distance_km, ConnectionState, EngineConfig, FeedMessage, LatLng, Node, NodeRegistry,
    PathRelation, RoutingDecision, SimulatedUser, Tier, UserId,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Total steps executed
    pub total_steps: u64,

    /// Final simulation time in seconds
    pub final_time_secs: f64,

    /// Routes left in the ledger at the end
    pub final_route_count: usize,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScenarioMetrics {
    /// Simulation requests sent to the decision engine
    pub requests_sent: u64,

    /// Requests dropped while the feed was down
    pub requests_dropped: u64,

    pub decisions_accepted: u64,
    pub decisions_rejected: u64,

    /// Inbound frames that were not routing decisions
    pub messages_dropped: u64,

    /// Feed connection attempts (initial + reconnects)
    pub connection_attempts: u64,

    /// Most routes visible at once
    pub peak_visible_routes: usize,
}

macro_rules! check {
    ($cond:expr, $($msg:tt)+) => {
        if !$cond {
            return Err(format!($($msg)+));
        }
    };
}

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

/// Runs session scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Virtual time per step
    step: Duration,

    /// Minimum simulated duration; scenarios that finish early soak until then
    duration: Duration,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            step: Duration::from_millis(100),
            duration: Duration::from_secs(10),
        }
    }

    /// Sets the step size.
    pub fn with_step(mut self, step: Duration) -> Self {
        self.step = step;
        self
    }

    /// Sets the minimum duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        self.execute(scenario, false).0
    }

    /// Runs a scenario, recording one frame per visibility tick.
    pub fn run_with_export(&self, scenario: ScenarioId) -> (ScenarioResult, SimExport) {
        let (result, frames) = self.execute(scenario, true);

        let mut export = SimExport::new(scenario.name(), self.seed);
        for frame in frames {
            export.add_frame(frame);
        }
        export.finalize(result.passed, result.failure_reason.clone());
        (result, export)
    }

    fn execute(&self, scenario: ScenarioId, record: bool) -> (ScenarioResult, Vec<SimFrame>) {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);
        debug!("  {}", scenario.description());

        let mut world = match self.setup(scenario) {
            Ok(world) => world,
            Err(e) => {
                let result = ScenarioResult {
                    scenario,
                    seed: self.seed,
                    passed: false,
                    total_steps: 0,
                    final_time_secs: 0.0,
                    final_route_count: 0,
                    failure_reason: Some(format!("setup failed: {}", e)),
                    metrics: ScenarioMetrics::default(),
                };
                return (result, Vec::new());
            }
        };
        if record {
            world.record();
        }

        let outcome = self
            .exercise(scenario, &mut world)
            .and_then(|()| self.soak(&mut world));
        world.stop();

        let session = world.session();
        let counters = session.counters();
        let metrics = ScenarioMetrics {
            requests_sent: counters.requests_sent,
            requests_dropped: counters.requests_dropped,
            decisions_accepted: counters.decisions_accepted,
            decisions_rejected: counters.decisions_rejected,
            messages_dropped: counters.messages_dropped,
            connection_attempts: session.connection().attempts(),
            peak_visible_routes: world.peak_visible(),
        };

        let result = ScenarioResult {
            scenario,
            seed: self.seed,
            passed: outcome.is_ok(),
            total_steps: world.step_count(),
            final_time_secs: world.now().as_secs_f64(),
            final_route_count: session.all_routes().len(),
            failure_reason: outcome.err(),
            metrics,
        };
        (result, world.take_frames())
    }

    fn setup(&self, scenario: ScenarioId) -> Result<SimWorld, SimError> {
        let registry = match scenario {
            ScenarioId::SingleHop => NodeRegistry::new(vec![
                Node::new("core-a", "Core A", 0.0, 0.0, Tier::Core),
                Node::new("edge-b", "Edge B", 1.0, 1.0, Tier::Edge),
            ])?,
            ScenarioId::NoCore => NodeRegistry::new(
                NodeRegistry::default_topology()
                    .nodes_of_tier(Tier::Edge)
                    .cloned()
                    .collect(),
            )?,
            _ => NodeRegistry::default_topology(),
        };

        let engine = match scenario {
            ScenarioId::HoverPin => EngineConfig::default().with_retention(Some(Duration::from_secs(10))),
            _ => EngineConfig::default(),
        };

        let config = SimConfig {
            seed: self.seed,
            step: self.step,
            engine,
        };
        SimWorld::new(config, registry)
    }

    fn exercise(&self, scenario: ScenarioId, world: &mut SimWorld) -> Result<(), String> {
        match scenario {
            ScenarioId::SingleHop => self.run_single_hop(world),
            ScenarioId::NoCore => self.run_no_core(world),
            ScenarioId::FeedOutage => self.run_feed_outage(world),
            ScenarioId::MalformedFeed => self.run_malformed_feed(world),
            ScenarioId::HoverPin => self.run_hover_pin(world),
            ScenarioId::RogueDecision => self.run_rogue_decision(world),
            ScenarioId::GlobalPing => self.run_global_ping(world),
        }
    }

    /// Keeps the session running until the minimum duration, then checks
    /// ledger invariants.
    fn soak(&self, world: &mut SimWorld) -> Result<(), String> {
        if world.now() < self.duration {
            world.run_for(self.duration - world.now());
        }

        let session = world.session();
        let routes = session.all_routes();
        check!(
            routes.windows(2).all(|w| w[0].id < w[1].id),
            "route ids out of insertion order"
        );
        for route in routes {
            check!(
                session.registry().is_known_edge(&route.node.id),
                "{} references non-edge node {}",
                route.id,
                route.node.id
            );
        }
        Ok(())
    }

    /// Seeded user placements, spread over populated latitudes.
    fn positions(&self, count: usize) -> Vec<LatLng> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_mul(0x9e3779b97f4a7c15));
        (0..count)
            .map(|_| LatLng::new(rng.gen_range(-60.0..60.0), rng.gen_range(-180.0..180.0)))
            .collect()
    }

    fn run_single_hop(&self, world: &mut SimWorld) -> Result<(), String> {
        world.start();
        check!(world.state() == ConnectionState::Connected, "feed did not connect");

        let user = world.place_user(LatLng::new(1.0, 1.1));
        world.step();

        let routes = world.session().all_routes();
        check!(routes.len() == 1, "expected 1 route, got {}", routes.len());
        check!(routes[0].node.id == "edge-b", "routed to {}", routes[0].node.id);
        check!(routes[0].user.id == user.id, "route for wrong user");
        let created = routes[0].created_at;

        world.step();
        check!(world.now() - created == ms(100), "clock drifted");
        let snapshot = world.snapshot();
        let relations: Vec<PathRelation> = snapshot.paths.iter().map(|p| p.relation).collect();
        check!(
            relations == vec![PathRelation::UserToEdge, PathRelation::EdgeToCore],
            "unexpected paths {:?}",
            relations
        );
        check!(
            snapshot.paths[0].waypoints.first() == Some(&user.position()),
            "user hop does not start at the user"
        );
        check!(
            snapshot.paths[1].waypoints.last() == Some(&LatLng::new(0.0, 0.0)),
            "core hop does not end at core A"
        );

        world.run_for(ms(3000));
        check!(world.snapshot().paths.is_empty(), "route still visible after window");
        check!(world.session().all_routes().len() == 1, "expired route was removed");
        Ok(())
    }

    fn run_no_core(&self, world: &mut SimWorld) -> Result<(), String> {
        world.start();
        for at in self.positions(1) {
            world.place_user(at);
        }
        world.step();

        let snapshot = world.snapshot();
        check!(snapshot.stats.core_nodes == 0, "topology has cores");
        check!(snapshot.paths.len() == 1, "expected 1 path, got {}", snapshot.paths.len());
        check!(
            snapshot.paths[0].relation == PathRelation::UserToEdge,
            "unexpected relation {}",
            snapshot.paths[0].relation.as_str()
        );
        Ok(())
    }

    fn run_feed_outage(&self, world: &mut SimWorld) -> Result<(), String> {
        world.set_reachable(false);
        world.start();
        check!(world.state() == ConnectionState::Disconnected, "connected to unreachable feed");

        for at in self.positions(1) {
            world.place_user(at);
        }
        check!(world.sent().is_empty(), "request sent while disconnected");
        check!(world.session().users().len() == 1, "user not recorded");
        check!(world.session().counters().requests_dropped == 1, "drop not counted");

        // Attempts at 0s, 3s, 6s, 9s
        world.run_for(ms(9500));
        let attempts = world.session().connection().attempts();
        check!(attempts == 4, "expected 4 attempts by 9.5s, got {}", attempts);

        world.set_reachable(true);
        world.run_for(ms(3000));
        check!(world.state() == ConnectionState::Connected, "feed did not recover");
        check!(world.session().connection().attempts() == 5, "extra reconnect attempts");

        check!(world.ping_all() == 1, "ping-all did not re-request");
        world.step();
        check!(world.session().all_routes().len() == 1, "no route after recovery");

        world.sever();
        check!(world.state() == ConnectionState::Disconnected, "sever not observed");
        world.run_for(ms(2900));
        check!(world.state() == ConnectionState::Disconnected, "reconnected before delay");
        world.step();
        check!(world.state() == ConnectionState::Connected, "no reconnect after exactly 3s");
        Ok(())
    }

    fn run_malformed_feed(&self, world: &mut SimWorld) -> Result<(), String> {
        world.start();

        let at = self.positions(1)[0];
        let stray = SimulatedUser::new(UserId::new("stray"), at);
        let ghost = FeedMessage::RoutingDecision(RoutingDecision {
            user: stray.clone(),
            node: Node::new("edge-atlantis", "Atlantis", 0.0, -30.0, Tier::Edge),
            distance_km: 1.0,
        })
        .encode()
        .map_err(|e| e.to_string())?;
        let partial = serde_json::json!({ "type": "ROUTING_DECISION", "user": stray }).to_string();

        world.inject("not json at all");
        world.inject(r#"{"type": "HEARTBEAT"}"#);
        world.inject(partial);
        world.inject(ghost);
        world.step();

        let counters = world.session().counters();
        check!(counters.messages_dropped == 3, "dropped {} frames, expected 3", counters.messages_dropped);
        check!(counters.decisions_rejected == 1, "rejected {} decisions, expected 1", counters.decisions_rejected);
        check!(world.session().all_routes().is_empty(), "bad frame reached the ledger");
        check!(world.state() == ConnectionState::Connected, "bad frames broke the feed");

        world.place_user(at);
        world.step();
        check!(world.session().all_routes().len() == 1, "feed unusable after bad frames");
        Ok(())
    }

    fn run_hover_pin(&self, world: &mut SimWorld) -> Result<(), String> {
        world.start();
        let placed: Vec<SimulatedUser> = self.positions(2).into_iter().map(|at| world.place_user(at)).collect();
        world.step();
        check!(world.session().all_routes().len() == 2, "expected 2 routes");

        world.run_for(ms(5000));
        check!(world.snapshot().stats.visible_routes == 0, "routes visible past window");

        let pinned = placed[0].id.clone();
        world.hover(Some(pinned.clone()));
        let snapshot = world.snapshot();
        check!(snapshot.stats.visible_routes == 1, "hover pinned {} routes", snapshot.stats.visible_routes);
        check!(snapshot.paths.len() == 2, "pinned route drew {} paths", snapshot.paths.len());

        // Retention is 10s; routes of placed users outlive it
        world.run_for(ms(20_000));
        check!(world.session().all_routes().len() == 2, "placed users' routes pruned");

        let other = placed[1].id.clone();
        world.hover(Some(other.clone()));
        let snapshot = world.snapshot();
        check!(snapshot.stats.visible_routes == 1, "re-hover pinned {} routes", snapshot.stats.visible_routes);

        world.delete_user(&pinned);
        world.run_for(ms(1000));
        let routes = world.session().all_routes();
        check!(routes.len() == 1, "expected only the placed user's route, got {}", routes.len());
        check!(routes[0].belongs_to(&other), "deleted user's route survived retention");

        // Deleting the hovered user releases the hover too
        world.delete_user(&other);
        check!(world.snapshot().stats.visible_routes == 0, "route visible after delete");
        world.run_for(ms(1000));
        check!(world.session().all_routes().is_empty(), "released route not pruned");
        Ok(())
    }

    fn run_rogue_decision(&self, world: &mut SimWorld) -> Result<(), String> {
        world.start();
        let core = world
            .session()
            .registry()
            .nodes_of_tier(Tier::Core)
            .next()
            .cloned()
            .ok_or("topology has no core")?;

        world.set_decider(DeciderMode::Fixed(core));
        for at in self.positions(3) {
            world.place_user(at);
        }
        world.step();
        check!(world.session().counters().decisions_rejected == 3, "core decisions accepted");
        check!(world.session().all_routes().is_empty(), "core node entered the ledger");

        world.set_decider(DeciderMode::Fixed(Node::new("edge-phantom", "Phantom", 10.0, 10.0, Tier::Edge)));
        check!(world.ping_all() == 3, "ping-all did not re-request");
        world.step();
        check!(world.session().counters().decisions_rejected == 6, "unknown edge accepted");

        world.set_decider(DeciderMode::Nearest);
        world.ping_all();
        world.step();
        check!(world.session().all_routes().len() == 3, "honest decisions rejected");
        check!(world.session().counters().decisions_accepted == 3, "accepted count off");
        Ok(())
    }

    fn run_global_ping(&self, world: &mut SimWorld) -> Result<(), String> {
        world.start();
        for at in self.positions(5) {
            world.place_user(at);
        }
        world.step();

        let session = world.session();
        check!(session.all_routes().len() == 5, "expected 5 routes, got {}", session.all_routes().len());
        let edges = session.registry().edge_nodes();
        for route in session.all_routes() {
            let nearest = edges
                .iter()
                .map(|e| surface_distance_km(route.user.position(), e.position()))
                .fold(f64::INFINITY, f64::min);
            check!(
                (route.distance_km - nearest).abs() < 0.01,
                "{} routed to {} ({} km) but nearest edge is {} km",
                route.id,
                route.node.id,
                route.distance_km,
                nearest
            );
        }

        check!(world.ping_all() == 5, "ping-all skipped users");
        world.step();
        check!(world.session().all_routes().len() == 10, "ping-all did not produce routes");
        check!(world.session().counters().requests_sent == 10, "request count off");

        let nodes = world.session().all_nodes().len();
        world.clear();
        check!(world.session().all_routes().is_empty(), "routes survived clear");
        check!(world.session().users().is_empty(), "users survived clear");
        check!(world.session().all_nodes().len() == nodes, "clear touched the topology");
        check!(world.ping_all() == 0, "ping-all with no users sent requests");
        Ok(())
    }
}
