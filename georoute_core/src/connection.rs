//! Live-feed connection lifecycle and reconnection policy.
//!
//! Sans-IO: the manager never touches a socket. The driver reports transport
//! events (`on_open`, `on_closed`) and polls `poll_reconnect` with the
//! current time; the manager decides what state the feed is in, when the
//! next attempt is due, and whether outbound requests may be sent.
//!
//! ```text
//!              begin_connect
//!   (start) ─────────────────► connecting ──on_open──► connected
//!                                  │  ▲                    │
//!                        on_closed │  │ poll_reconnect     │ on_closed
//!                                  ▼  │ (after 3s)         │
//!                              disconnected ◄──────────────┘
//! ```
//!
//! The reconnect delay is fixed: no backoff growth and no retry cap.

use crate::protocol::{decode_decision, encode_simulation, RoutingDecision, SimulatedUser};
use crate::registry::Node;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// State of the live feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Owns the feed state machine and the pending reconnect timer.
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    state: ConnectionState,

    /// Fixed delay between a close and the next attempt
    reconnect_delay: Duration,

    /// Deadline of the pending reconnect, if one is scheduled
    reconnect_at: Option<Duration>,

    /// Connection attempts begun so far
    attempts: u64,

    /// Set by `cancel`; suppresses any further scheduling
    cancelled: bool,
}

impl ConnectionManager {
    /// Creates an idle manager (`disconnected`, nothing scheduled).
    pub fn new(reconnect_delay: Duration) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            reconnect_delay,
            reconnect_at: None,
            attempts: 0,
            cancelled: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn reconnect_delay(&self) -> Duration {
        self.reconnect_delay
    }

    /// Deadline of the pending reconnect timer.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.reconnect_at
    }

    fn transition(&mut self, next: ConnectionState) {
        if self.state != next {
            info!(from = %self.state, to = %next, "feed state");
            self.state = next;
        }
    }

    /// Enters `connecting`; the driver must now open the transport.
    ///
    /// Clears any earlier cancellation so a stopped session can be restarted.
    pub fn begin_connect(&mut self) {
        self.cancelled = false;
        self.reconnect_at = None;
        self.attempts += 1;
        self.transition(ConnectionState::Connecting);
    }

    /// The transport opened successfully.
    pub fn on_open(&mut self) {
        match self.state {
            ConnectionState::Connecting => self.transition(ConnectionState::Connected),
            other => warn!(state = %other, "feed: open reported outside of connecting, ignored"),
        }
    }

    /// The transport closed or failed; schedules the next attempt.
    ///
    /// A close while already `disconnected` keeps the existing deadline.
    pub fn on_closed(&mut self, now: Duration) {
        if self.state == ConnectionState::Disconnected {
            return;
        }
        self.transition(ConnectionState::Disconnected);
        if self.cancelled {
            return;
        }
        let at = now + self.reconnect_delay;
        debug!(delay_ms = self.reconnect_delay.as_millis() as u64, "feed: reconnect scheduled");
        self.reconnect_at = Some(at);
    }

    /// Fires the reconnect timer if it is due.
    ///
    /// Returns true exactly once per scheduled delay, having moved the state
    /// to `connecting`; the driver must then open the transport.
    pub fn poll_reconnect(&mut self, now: Duration) -> bool {
        match self.reconnect_at {
            Some(at) if !self.cancelled && now >= at => {
                info!(attempt = self.attempts + 1, "feed: reconnecting");
                self.begin_connect();
                true
            }
            _ => false,
        }
    }

    /// Releases the reconnect timer and refuses to schedule another one.
    pub fn cancel(&mut self) {
        self.cancelled = true;
        self.reconnect_at = None;
        self.transition(ConnectionState::Disconnected);
    }

    /// Decodes an inbound frame; anything but a well-formed routing
    /// decision is dropped with a warning.
    pub fn decode(&self, text: &str) -> Option<RoutingDecision> {
        match decode_decision(text) {
            Ok(decision) => Some(decision),
            Err(e) => {
                warn!(error = %e, "feed: dropping inbound message");
                None
            }
        }
    }

    /// Builds a traffic-simulation request if the feed is connected.
    ///
    /// Returns `None` (request dropped, caller not notified) otherwise.
    pub fn request_simulation(&self, edge_nodes: &[Node], user: &SimulatedUser) -> Option<String> {
        if !self.is_connected() {
            debug!(user = %user.id, state = %self.state, "feed: not connected, simulation request dropped");
            return None;
        }
        match encode_simulation(edge_nodes, user) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(error = %e, "feed: failed to encode simulation request");
                None
            }
        }
    }
}
