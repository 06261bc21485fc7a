//! Stand-in for the external decision engine.
//!
//! Answers `SIMULATE_TRAFFIC` requests the way the production engine does
//! (closest offered node by great-circle distance), or misbehaves on purpose.

use georoute_core::{surface_distance_km, FeedMessage, Node, RoutingDecision};
use tracing::debug;

/// How the simulated decision engine answers.
#[derive(Debug, Clone, PartialEq)]
pub enum DeciderMode {
    /// Route to the nearest offered node
    Nearest,
    /// Never answer
    Silent,
    /// Always answer with this node, offered or not
    Fixed(Node),
}

/// Produces `ROUTING_DECISION` replies for request frames.
#[derive(Debug, Clone)]
pub struct Decider {
    mode: DeciderMode,
}

impl Decider {
    pub fn new(mode: DeciderMode) -> Self {
        Self { mode }
    }

    pub fn nearest() -> Self {
        Self::new(DeciderMode::Nearest)
    }

    pub fn mode(&self) -> &DeciderMode {
        &self.mode
    }

    pub fn set_mode(&mut self, mode: DeciderMode) {
        self.mode = mode;
    }

    /// Reply to one outbound frame, if any.
    ///
    /// Frames that are not a `SIMULATE_TRAFFIC` request, or that offer no
    /// nodes, get no reply.
    pub fn respond(&self, frame: &str) -> Option<String> {
        let (nodes, user) = match FeedMessage::decode(frame) {
            Ok(FeedMessage::SimulateTraffic { nodes, user }) => (nodes, user),
            Ok(other) => {
                debug!(kind = other.kind(), "decider: ignoring frame");
                return None;
            }
            Err(e) => {
                debug!(error = %e, "decider: undecodable frame");
                return None;
            }
        };

        let node = match &self.mode {
            DeciderMode::Silent => return None,
            DeciderMode::Fixed(node) => node.clone(),
            DeciderMode::Nearest => {
                let mut best: Option<(&Node, f64)> = None;
                for node in &nodes {
                    let d = surface_distance_km(user.position(), node.position());
                    if best.map_or(true, |(_, min)| d < min) {
                        best = Some((node, d));
                    }
                }
                best?.0.clone()
            }
        };

        let distance_km = round2(surface_distance_km(user.position(), node.position()));
        FeedMessage::RoutingDecision(RoutingDecision { user, node, distance_km })
            .encode()
            .ok()
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use georoute_core::protocol::{decode_decision, encode_simulation};
    use georoute_core::{LatLng, SimulatedUser, Tier, UserId};

    fn user() -> SimulatedUser {
        SimulatedUser::new(UserId::new("u"), LatLng::new(1.0, 1.1))
    }

    fn edges() -> Vec<Node> {
        vec![
            Node::new("edge-far", "Far", 40.0, 40.0, Tier::Edge),
            Node::new("edge-b", "B", 1.0, 1.0, Tier::Edge),
        ]
    }

    #[test]
    fn test_nearest_node_chosen() {
        let request = encode_simulation(&edges(), &user()).unwrap();
        let reply = Decider::nearest().respond(&request).unwrap();
        let decision = decode_decision(&reply).unwrap();

        assert_eq!(decision.node.id, "edge-b");
        assert_eq!(decision.user, user());
        // ~11.1 km, rounded to two decimals
        assert!((decision.distance_km - 11.12).abs() < 0.02);
        assert_eq!(decision.distance_km, round2(decision.distance_km));
    }

    #[test]
    fn test_silent_never_answers() {
        let request = encode_simulation(&edges(), &user()).unwrap();
        assert!(Decider::new(DeciderMode::Silent).respond(&request).is_none());
    }

    #[test]
    fn test_fixed_answers_regardless() {
        let rogue = Node::new("core-x", "X", 0.0, 0.0, Tier::Core);
        let request = encode_simulation(&edges(), &user()).unwrap();
        let reply = Decider::new(DeciderMode::Fixed(rogue.clone())).respond(&request).unwrap();
        assert_eq!(decode_decision(&reply).unwrap().node, rogue);
    }

    #[test]
    fn test_no_nodes_no_reply() {
        let request = encode_simulation(&[], &user()).unwrap();
        assert!(Decider::nearest().respond(&request).is_none());
        assert!(Decider::nearest().respond("not json").is_none());
    }
}
