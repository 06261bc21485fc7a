//! Feed wire protocol (JSON text messages).
//!
//! ```text
//! out: {"type": "SIMULATE_TRAFFIC", "nodes": [Node...], "user": {id, lat, lng}}
//! in:  {"type": "ROUTING_DECISION", "user": {...}, "node": Node, "distance_km": n}
//! ```

use crate::error::ProtocolError;
use crate::geo_math::LatLng;
use crate::registry::Node;
use serde::{Deserialize, Serialize};

/// Identifier of a simulated user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A simulated client placed on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedUser {
    pub id: UserId,
    pub lat: f64,
    pub lng: f64,
}

impl SimulatedUser {
    pub fn new(id: UserId, at: LatLng) -> Self {
        Self {
            id,
            lat: at.lat,
            lng: at.lng,
        }
    }

    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

/// The edge node an external decision engine chose for a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub user: SimulatedUser,
    pub node: Node,
    pub distance_km: f64,
}

/// Every message type carried by the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedMessage {
    /// Ask the decision engine to route `user` to one of `nodes`
    SimulateTraffic { nodes: Vec<Node>, user: SimulatedUser },

    /// The decision engine's answer
    RoutingDecision(RoutingDecision),
}

impl FeedMessage {
    /// Wire name of the message type.
    pub fn kind(&self) -> &'static str {
        match self {
            FeedMessage::SimulateTraffic { .. } => "SIMULATE_TRAFFIC",
            FeedMessage::RoutingDecision(_) => "ROUTING_DECISION",
        }
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses any feed message.
    pub fn decode(text: &str) -> Result<FeedMessage, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Builds the outbound `SIMULATE_TRAFFIC` frame.
pub fn encode_simulation(edge_nodes: &[Node], user: &SimulatedUser) -> Result<String, ProtocolError> {
    FeedMessage::SimulateTraffic {
        nodes: edge_nodes.to_vec(),
        user: user.clone(),
    }
    .encode()
}

/// Decodes an inbound frame, accepting only well-formed `ROUTING_DECISION`s.
///
/// Other message types are `UnexpectedType`; missing or mistyped fields are
/// `Json`. Unknown extra fields are ignored.
pub fn decode_decision(text: &str) -> Result<RoutingDecision, ProtocolError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let kind = value
        .get("type")
        .and_then(serde_json::Value::as_str)
        .ok_or(ProtocolError::MissingType)?;
    if kind != "ROUTING_DECISION" {
        return Err(ProtocolError::UnexpectedType(kind.to_string()));
    }
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Tier;
    use serde_json::json;

    fn edge_b() -> Node {
        Node::new("edge-b", "B", 1.0, 1.0, Tier::Edge)
    }

    fn user_u() -> SimulatedUser {
        SimulatedUser::new(UserId::new("u1"), LatLng::new(1.0, 1.1))
    }

    #[test]
    fn test_simulation_request_shape() {
        let text = encode_simulation(&[edge_b()], &user_u()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(
            value,
            json!({
                "type": "SIMULATE_TRAFFIC",
                "nodes": [{"id": "edge-b", "name": "B", "lat": 1.0, "lng": 1.0, "type": "edge"}],
                "user": {"id": "u1", "lat": 1.0, "lng": 1.1}
            })
        );
    }

    #[test]
    fn test_decode_routing_decision() {
        let text = json!({
            "type": "ROUTING_DECISION",
            "user": {"id": "u1", "lat": 1.0, "lng": 1.1},
            "node": {"id": "edge-b", "name": "B", "lat": 1.0, "lng": 1.0, "type": "edge"},
            "distance_km": 10
        })
        .to_string();

        let decision = decode_decision(&text).unwrap();
        assert_eq!(decision.user, user_u());
        assert_eq!(decision.node, edge_b());
        assert_eq!(decision.distance_km, 10.0);
    }

    #[test]
    fn test_decode_ignores_extra_fields() {
        let text = json!({
            "type": "ROUTING_DECISION",
            "user": {"id": "u1", "lat": 1.0, "lng": 1.1, "label": "x"},
            "node": {"id": "edge-b", "name": "B", "lat": 1.0, "lng": 1.0, "type": "edge"},
            "distance_km": 10.5,
            "latency_ms": 3
        })
        .to_string();
        assert!(decode_decision(&text).is_ok());
    }

    #[test]
    fn test_decode_rejects_other_types() {
        let text = encode_simulation(&[edge_b()], &user_u()).unwrap();
        assert!(matches!(
            decode_decision(&text),
            Err(ProtocolError::UnexpectedType(t)) if t == "SIMULATE_TRAFFIC"
        ));

        let text = json!({"type": "HEARTBEAT"}).to_string();
        assert!(matches!(decode_decision(&text), Err(ProtocolError::UnexpectedType(_))));
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert!(matches!(decode_decision("not json"), Err(ProtocolError::Json(_))));
        assert!(matches!(decode_decision("[1, 2]"), Err(ProtocolError::MissingType)));
        assert!(matches!(decode_decision(r#"{"type": 7}"#), Err(ProtocolError::MissingType)));

        // Missing distance_km
        let text = json!({
            "type": "ROUTING_DECISION",
            "user": {"id": "u1", "lat": 1.0, "lng": 1.1},
            "node": {"id": "edge-b", "name": "B", "lat": 1.0, "lng": 1.0, "type": "edge"}
        })
        .to_string();
        assert!(matches!(decode_decision(&text), Err(ProtocolError::Json(_))));

        // Mistyped user coordinate
        let text = json!({
            "type": "ROUTING_DECISION",
            "user": {"id": "u1", "lat": "north", "lng": 1.1},
            "node": {"id": "edge-b", "name": "B", "lat": 1.0, "lng": 1.0, "type": "edge"},
            "distance_km": 1
        })
        .to_string();
        assert!(matches!(decode_decision(&text), Err(ProtocolError::Json(_))));
    }

    #[test]
    fn test_feed_message_decode_both_kinds() {
        let request = encode_simulation(&[edge_b()], &user_u()).unwrap();
        let message = FeedMessage::decode(&request).unwrap();
        assert_eq!(message.kind(), "SIMULATE_TRAFFIC");

        let answer = FeedMessage::RoutingDecision(RoutingDecision {
            user: user_u(),
            node: edge_b(),
            distance_km: 10.0,
        });
        let text = answer.encode().unwrap();
        assert_eq!(decode_decision(&text).unwrap().node.id, "edge-b");
    }
}
