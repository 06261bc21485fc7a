//! SimWorld - synchronous harness driving one session on a virtual clock.
//!
//! The world plays both the driver and the decision engine: frames the
//! session sends are answered by a `Decider` and delivered one step later,
//! so every run is a pure function of the seed and the scripted actions.

use crate::context::SimContext;
use crate::decider::{Decider, DeciderMode};
use crate::error::SimError;
use crate::exporter::SimFrame;
use georoute_core::{
    ConnectionState, EngineConfig, LatLng, NodeRegistry, Session, SimulatedUser, Snapshot,
    SnapshotProjector, UserId,
};
use georoute_env::RouteContext;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Virtual time advanced per step
    pub step: Duration,

    /// Engine settings for the session under test
    pub engine: EngineConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            step: Duration::from_millis(100),
            engine: EngineConfig::default(),
        }
    }
}

/// The SimWorld - one session plus its simulated feed.
pub struct SimWorld {
    /// Configuration
    pub config: SimConfig,

    /// Shared simulation context (virtual clock)
    pub context: Arc<SimContext>,

    session: Session<SimContext>,
    decider: Decider,

    /// Whether connection attempts succeed
    reachable: bool,

    /// Whether the simulated link is currently open
    link_up: bool,

    /// Frames on their way to the session, delivered on the next step
    inbound: VecDeque<String>,

    /// Every frame the session sent over the link
    sent: Vec<String>,

    step_count: u64,
    peak_visible: usize,

    /// Tick frames, when recording
    frames: Option<Vec<SimFrame>>,
}

impl SimWorld {
    /// Creates a world over the given topology. The session is not started.
    pub fn new(config: SimConfig, registry: NodeRegistry) -> Result<Self, SimError> {
        let context = SimContext::shared(config.seed);
        let session = Session::new(context.clone(), Arc::new(registry), config.engine.clone())?;

        Ok(Self {
            config,
            context,
            session,
            decider: Decider::nearest(),
            reachable: true,
            link_up: false,
            inbound: VecDeque::new(),
            sent: Vec::new(),
            step_count: 0,
            peak_visible: 0,
            frames: None,
        })
    }

    /// Starts capturing one frame per visibility tick.
    pub fn record(&mut self) {
        self.frames.get_or_insert_with(Vec::new);
    }

    pub fn take_frames(&mut self) -> Vec<SimFrame> {
        self.frames.take().unwrap_or_default()
    }

    pub fn start(&mut self) {
        if self.session.start() {
            self.open();
        }
    }

    fn open(&mut self) {
        if self.reachable {
            self.link_up = true;
            self.session.on_feed_open();
        } else {
            self.session.on_feed_closed();
        }
    }

    /// Sends queued frames over the link and queues the decider's replies.
    fn flush(&mut self) {
        for frame in self.session.take_outbox() {
            if !self.link_up {
                continue;
            }
            if let Some(reply) = self.decider.respond(&frame) {
                self.inbound.push_back(reply);
            }
            self.sent.push(frame);
        }
    }

    /// Advances the world by one step.
    pub fn step(&mut self) {
        self.context.advance_time(self.config.step);
        self.step_count += 1;

        while let Some(frame) = self.inbound.pop_front() {
            self.session.on_feed_message(&frame);
        }

        if self.session.poll_reconnect() {
            self.open();
        }
        let ticked = self.session.poll_tick();
        self.flush();

        let visible = SnapshotProjector::new(self.session.registry(), self.session.config()).visible_count(
            self.session.all_routes(),
            self.context.now(),
            self.session.hovered(),
        );
        self.peak_visible = self.peak_visible.max(visible);

        if ticked {
            if let Some(frames) = self.frames.as_mut() {
                frames.push(SimFrame::from_snapshot(&self.session.snapshot(), self.context.system_time()));
            }
        }
    }

    /// Steps until `duration` of virtual time has elapsed.
    pub fn run_for(&mut self, duration: Duration) {
        let steps = duration.as_nanos() / self.config.step.as_nanos().max(1);
        for _ in 0..steps {
            self.step();
        }
    }

    /// Steps until `done` holds, for at most `limit` of virtual time.
    pub fn run_until<F>(&mut self, limit: Duration, mut done: F) -> bool
    where
        F: FnMut(&SimWorld) -> bool,
    {
        let deadline = self.context.now() + limit;
        while !done(&*self) {
            if self.context.now() >= deadline {
                return false;
            }
            self.step();
        }
        true
    }

    // ═══════════════════════════════════════════════════
    // Fault injection
    // ═══════════════════════════════════════════════════

    pub fn set_reachable(&mut self, reachable: bool) {
        self.reachable = reachable;
    }

    /// Drops the live link; in-flight replies are lost.
    pub fn sever(&mut self) {
        if self.link_up {
            debug!("sim: severing feed");
            self.link_up = false;
            self.inbound.clear();
            self.session.on_feed_closed();
        }
    }

    /// Queues a raw inbound frame. Returns false if the link is down.
    pub fn inject(&mut self, frame: impl Into<String>) -> bool {
        if !self.link_up {
            return false;
        }
        self.inbound.push_back(frame.into());
        true
    }

    pub fn set_decider(&mut self, mode: DeciderMode) {
        self.decider.set_mode(mode);
    }

    // ═══════════════════════════════════════════════════
    // User actions
    // ═══════════════════════════════════════════════════

    pub fn place_user(&mut self, at: LatLng) -> SimulatedUser {
        let user = self.session.place_user(at);
        self.flush();
        user
    }

    pub fn ping_all(&mut self) -> usize {
        let sent = self.session.ping_all();
        self.flush();
        sent
    }

    pub fn clear(&mut self) {
        self.session.clear();
    }

    pub fn hover(&mut self, user: Option<UserId>) {
        self.session.set_hover(user);
    }

    pub fn delete_user(&mut self, id: &UserId) -> bool {
        self.session.delete_user(id)
    }

    pub fn stop(&mut self) {
        self.session.stop();
        self.link_up = false;
        self.inbound.clear();
    }

    // ═══════════════════════════════════════════════════
    // Observation
    // ═══════════════════════════════════════════════════

    pub fn session(&self) -> &Session<SimContext> {
        &self.session
    }

    pub fn snapshot(&self) -> Snapshot {
        self.session.snapshot()
    }

    pub fn state(&self) -> ConnectionState {
        self.session.connection().state()
    }

    pub fn now(&self) -> Duration {
        self.context.now()
    }

    pub fn sent(&self) -> &[String] {
        &self.sent
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Largest number of simultaneously visible routes seen after any step.
    pub fn peak_visible(&self) -> usize {
        self.peak_visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use georoute_core::{Node, Tier};

    fn world() -> SimWorld {
        let registry = NodeRegistry::new(vec![
            Node::new("core-a", "A", 0.0, 0.0, Tier::Core),
            Node::new("edge-b", "B", 1.0, 1.0, Tier::Edge),
        ])
        .unwrap();
        SimWorld::new(SimConfig::default(), registry).unwrap()
    }

    #[test]
    fn test_reply_arrives_next_step() {
        let mut world = world();
        world.start();
        assert_eq!(world.state(), ConnectionState::Connected);

        world.place_user(LatLng::new(1.0, 1.1));
        assert_eq!(world.sent().len(), 1);
        assert!(world.session().all_routes().is_empty());

        world.step();
        assert_eq!(world.session().all_routes().len(), 1);
        assert_eq!(world.peak_visible(), 1);
    }

    #[test]
    fn test_unreachable_feed_retries() {
        let mut world = world();
        world.set_reachable(false);
        world.start();
        assert_eq!(world.state(), ConnectionState::Disconnected);

        world.run_for(Duration::from_millis(3000));
        assert_eq!(world.session().connection().attempts(), 2);

        world.set_reachable(true);
        world.run_for(Duration::from_millis(3000));
        assert_eq!(world.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_recording_captures_ticks() {
        let mut world = world();
        world.record();
        world.start();
        world.run_for(Duration::from_secs(3));

        let frames = world.take_frames();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2].tick, 3);
    }

    #[test]
    fn test_same_seed_same_user_ids() {
        let mut a = world();
        let mut b = world();
        a.start();
        b.start();
        assert_eq!(a.place_user(LatLng::new(0.0, 0.0)).id, b.place_user(LatLng::new(0.0, 0.0)).id);
    }
}
