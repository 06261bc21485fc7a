//! The visualization session: single owner of all mutable engine state.
//!
//! A `Session` bundles the connection manager, the route ledger, the placed
//! users and the hover selection, and advances only in response to discrete
//! events:
//!
//! - feed events (`on_feed_open`, `on_feed_message`, `on_feed_closed`)
//! - user actions (`place_user`, `ping_all`, `clear`, `delete_user`, `set_hover`)
//! - timer polls (`poll_reconnect`, `poll_tick`)
//!
//! It performs no IO. Outbound frames accumulate in an outbox that the driver
//! drains with `take_outbox`; time is read from the `RouteContext`. The async
//! driver lives in `runtime`, the deterministic one in the simulation crate.

use crate::config::EngineConfig;
use crate::connection::ConnectionManager;
use crate::error::ConfigError;
use crate::geo_math::LatLng;
use crate::ledger::{Route, RouteId, RouteLedger};
use crate::projector::{Snapshot, SnapshotProjector};
use crate::protocol::{SimulatedUser, UserId};
use crate::registry::{Node, NodeRegistry};
use georoute_env::RouteContext;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A user action or control request delivered to a running session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    /// Place a simulated user and request a routing decision for it
    PlaceUser(LatLng),
    /// Re-request decisions for every current user
    PingAll,
    /// Forget every route and user
    Clear,
    DeleteUser(UserId),
    /// Pin (or release) one user's routes past the visibility window
    Hover(Option<UserId>),
    Stop,
}

/// Running totals for diagnostics and scenario checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionCounters {
    /// `SIMULATE_TRAFFIC` frames queued for the feed
    pub requests_sent: u64,
    /// Requests not sent (feed down or no edge nodes)
    pub requests_dropped: u64,
    pub decisions_accepted: u64,
    /// Well-formed decisions rejected by the ledger
    pub decisions_rejected: u64,
    /// Inbound frames that were not a decodable `ROUTING_DECISION`
    pub messages_dropped: u64,
}

/// Owned engine state with explicit `start`/`stop`.
pub struct Session<Ctx: RouteContext> {
    context: Arc<Ctx>,
    config: EngineConfig,
    registry: Arc<NodeRegistry>,
    connection: ConnectionManager,
    ledger: RouteLedger,

    /// Users placed on the map, in placement order
    users: Vec<SimulatedUser>,

    hovered: Option<UserId>,

    /// Encoded frames waiting for the driver
    outbox: Vec<String>,

    /// Deadline of the next visibility tick (None when stopped)
    next_tick: Option<Duration>,
    tick_count: u64,

    running: bool,
    counters: SessionCounters,
}

impl<Ctx: RouteContext> Session<Ctx> {
    /// Creates an idle session over a fixed node topology.
    pub fn new(context: Arc<Ctx>, registry: Arc<NodeRegistry>, config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        info!(
            nodes = registry.len(),
            seed = context.seed(),
            window_ms = config.visibility_window.as_millis() as u64,
            "session created"
        );

        Ok(Self {
            connection: ConnectionManager::new(config.reconnect_delay),
            ledger: RouteLedger::new(registry.clone()),
            context,
            config,
            registry,
            users: Vec::new(),
            hovered: None,
            outbox: Vec::new(),
            next_tick: None,
            tick_count: 0,
            running: false,
            counters: SessionCounters::default(),
        })
    }

    /// Starts the session: arms the tick timer and begins connecting.
    ///
    /// Returns true when the driver must now open the feed transport
    /// (false if the session was already running).
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        self.next_tick = Some(self.context.now() + self.config.tick_interval);
        info!(feed = %self.config.feed_url, "session started");
        self.connection.begin_connect();
        true
    }

    /// Stops the session, releasing both timers.
    ///
    /// Safe to call on any exit path, including before the feed ever opened.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.next_tick = None;
        self.outbox.clear();
        self.connection.cancel();
        info!(routes = self.ledger.len(), ticks = self.tick_count, "session stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// The transport reported a successful open.
    pub fn on_feed_open(&mut self) {
        self.connection.on_open();
    }

    /// The transport closed or failed to open.
    pub fn on_feed_closed(&mut self) {
        let now = self.context.now();
        self.outbox.clear();
        self.connection.on_closed(now);
    }

    /// Handles one inbound text frame.
    ///
    /// Returns the id of the route it produced, if any. Malformed frames and
    /// rejected decisions are logged and counted but never fatal.
    pub fn on_feed_message(&mut self, text: &str) -> Option<RouteId> {
        let Some(decision) = self.connection.decode(text) else {
            self.counters.messages_dropped += 1;
            return None;
        };

        let user = decision.user.id.clone();
        match self.ledger.ingest(decision, self.context.now()) {
            Ok(id) => {
                self.counters.decisions_accepted += 1;
                debug!(route = %id, user = %user, "route ingested");
                Some(id)
            }
            Err(e) => {
                self.counters.decisions_rejected += 1;
                warn!(error = %e, user = %user, "routing decision rejected");
                None
            }
        }
    }

    /// Fires the reconnect timer if due.
    ///
    /// Returns true when the driver must open the feed transport again.
    pub fn poll_reconnect(&mut self) -> bool {
        self.running && self.connection.poll_reconnect(self.context.now())
    }

    /// Fires the visibility tick if due.
    ///
    /// The tick re-arms itself one interval later and applies retention
    /// pruning when configured. Routes of placed users and of the hovered
    /// user are never pruned, so hover can always bring them back. Returns
    /// true if a tick fired.
    pub fn poll_tick(&mut self) -> bool {
        let now = self.context.now();
        match self.next_tick {
            Some(at) if self.running && now >= at => {
                self.tick_count += 1;
                self.next_tick = Some(now + self.config.tick_interval);

                if let Some(retention) = self.config.retention {
                    let users = &self.users;
                    let hovered = self.hovered.as_ref();
                    let pruned = self.ledger.prune(now, retention, |id| {
                        hovered == Some(id) || users.iter().any(|user| &user.id == id)
                    });
                    if pruned > 0 {
                        debug!(pruned, "expired routes pruned");
                    }
                }
                true
            }
            _ => false,
        }
    }

    /// Earliest pending timer (tick or reconnect), if any.
    pub fn next_deadline(&self) -> Option<Duration> {
        if !self.running {
            return None;
        }
        match (self.next_tick, self.connection.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Places a simulated user and requests a routing decision for it.
    ///
    /// The user is always recorded; the request is only sent while the feed
    /// is connected and the registry has at least one edge node.
    pub fn place_user(&mut self, at: LatLng) -> SimulatedUser {
        let id = UserId::new(self.context.generate_id().to_string());
        let user = SimulatedUser::new(id, at);
        info!(user = %user.id, lat = at.lat, lng = at.lng, "user placed");

        self.users.push(user.clone());
        self.request(&user);
        user
    }

    fn request(&mut self, user: &SimulatedUser) -> bool {
        let edges = self.registry.edge_nodes();
        if edges.is_empty() {
            debug!(user = %user.id, "no edge nodes, simulation request skipped");
            self.counters.requests_dropped += 1;
            return false;
        }

        match self.connection.request_simulation(&edges, user) {
            Some(frame) => {
                self.outbox.push(frame);
                self.counters.requests_sent += 1;
                true
            }
            None => {
                self.counters.requests_dropped += 1;
                false
            }
        }
    }

    /// Re-issues a simulation request for every current user.
    ///
    /// Returns how many requests were queued.
    pub fn ping_all(&mut self) -> usize {
        if self.users.is_empty() {
            return 0;
        }
        let users = self.users.clone();
        let sent = users.iter().filter(|user| self.request(user)).count();
        info!(users = users.len(), sent, "ping all users");
        sent
    }

    /// Removes one user. Its routes stay in the ledger and expire normally;
    /// with retention configured they become prunable.
    pub fn delete_user(&mut self, id: &UserId) -> bool {
        let before = self.users.len();
        self.users.retain(|u| &u.id != id);
        if self.hovered.as_ref() == Some(id) {
            self.hovered = None;
        }
        self.users.len() != before
    }

    /// Empties routes and users. Nodes are untouched.
    pub fn clear(&mut self) {
        info!(routes = self.ledger.len(), users = self.users.len(), "clearing routes and users");
        self.ledger.clear();
        self.users.clear();
        self.hovered = None;
    }

    pub fn set_hover(&mut self, user: Option<UserId>) {
        self.hovered = user;
    }

    /// Applies a user command. Returns false once the session has stopped.
    pub fn apply(&mut self, command: SessionCommand) -> bool {
        match command {
            SessionCommand::PlaceUser(at) => {
                self.place_user(at);
            }
            SessionCommand::PingAll => {
                self.ping_all();
            }
            SessionCommand::Clear => self.clear(),
            SessionCommand::DeleteUser(id) => {
                self.delete_user(&id);
            }
            SessionCommand::Hover(user) => self.set_hover(user),
            SessionCommand::Stop => self.stop(),
        }
        self.running
    }

    /// Drains frames queued for the feed.
    pub fn take_outbox(&mut self) -> Vec<String> {
        std::mem::take(&mut self.outbox)
    }

    /// Projects the current state at the context's current time.
    pub fn snapshot(&self) -> Snapshot {
        SnapshotProjector::new(&self.registry, &self.config).snapshot(
            self.ledger.all_routes(),
            &self.users,
            self.connection.state(),
            self.context.now(),
            self.tick_count,
            self.hovered.as_ref(),
        )
    }

    pub fn all_nodes(&self) -> &[Node] {
        self.registry.all_nodes()
    }

    pub fn all_routes(&self) -> &[Route] {
        self.ledger.all_routes()
    }

    pub fn users(&self) -> &[SimulatedUser] {
        &self.users
    }

    pub fn hovered(&self) -> Option<&UserId> {
        self.hovered.as_ref()
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn ledger(&self) -> &RouteLedger {
        &self.ledger
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn context(&self) -> &Arc<Ctx> {
        &self.context
    }

    pub fn counters(&self) -> SessionCounters {
        self.counters
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}
