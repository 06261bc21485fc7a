//! Infrastructure registry: the static set of core and edge nodes.
//!
//! Loaded once at startup (built-in topology or a JSON file) and immutable
//! afterwards. Load order is significant: it is the iteration order of every
//! query and the tie-break for `nearest_core`.

use crate::error::RegistryError;
use crate::geo_math::{surface_distance_km, LatLng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Network tier of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Origin data center acting as the authoritative backend
    Core,
    /// Point of presence terminating user traffic
    Edge,
}

impl Tier {
    /// Wire name ("core" / "edge").
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Core => "core",
            Tier::Edge => "edge",
        }
    }

    /// Descriptive label shown in node detail views.
    pub fn label(&self) -> &'static str {
        match self {
            Tier::Core => "Core Origin Data Center",
            Tier::Edge => "Edge Point of Presence",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An infrastructure node. Identity is `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    /// Serialized as `type` on the wire
    #[serde(rename = "type")]
    pub tier: Tier,
}

impl Node {
    pub fn new(id: impl Into<String>, name: impl Into<String>, lat: f64, lng: f64, tier: Tier) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            lat,
            lng,
            tier,
        }
    }

    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }

    pub fn is_edge(&self) -> bool {
        self.tier == Tier::Edge
    }

    pub fn is_core(&self) -> bool {
        self.tier == Tier::Core
    }
}

/// The full node set, in load order, with unique ids.
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    nodes: Vec<Node>,

    /// id -> position in `nodes`
    index: HashMap<String, usize>,
}

impl NodeRegistry {
    /// Builds a registry, enforcing id uniqueness.
    pub fn new(nodes: Vec<Node>) -> Result<Self, RegistryError> {
        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            if index.insert(node.id.clone(), i).is_some() {
                return Err(RegistryError::DuplicateNode(node.id.clone()));
            }
        }
        Ok(Self { nodes, index })
    }

    /// A registry with no nodes.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses a JSON array of nodes (`[{id, name, lat, lng, type}, ...]`).
    pub fn from_json_str(json: &str) -> Result<Self, RegistryError> {
        let nodes: Vec<Node> = serde_json::from_str(json)?;
        Self::new(nodes)
    }

    /// Loads a JSON node file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Built-in infrastructure: 4 core origin data centers, 14 edge PoPs.
    pub fn default_topology() -> Self {
        let nodes = default_nodes();
        let index = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.id.clone(), i))
            .collect();
        Self { nodes, index }
    }

    /// All nodes in load order.
    pub fn all_nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Nodes of one tier, preserving load order.
    pub fn nodes_of_tier(&self, tier: Tier) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter().filter(move |n| n.tier == tier)
    }

    /// Owned copies of every edge node (payload of outbound traffic requests).
    pub fn edge_nodes(&self) -> Vec<Node> {
        self.nodes_of_tier(Tier::Edge).cloned().collect()
    }

    pub fn count(&self, tier: Tier) -> usize {
        self.nodes_of_tier(tier).count()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Looks up a node by id.
    pub fn get(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// True if `id` names a registered edge node.
    pub fn is_known_edge(&self, id: &str) -> bool {
        self.get(id).is_some_and(Node::is_edge)
    }

    /// The core node closest to `point` by surface distance.
    ///
    /// Ties resolve to the first core node in load order. Returns `None`
    /// when the registry holds no core nodes.
    pub fn nearest_core(&self, point: LatLng) -> Option<&Node> {
        let mut best: Option<(&Node, f64)> = None;
        for node in self.nodes_of_tier(Tier::Core) {
            let distance = surface_distance_km(point, node.position());
            match best {
                // Strict comparison keeps the earlier node on ties
                Some((_, best_distance)) if distance >= best_distance => {}
                _ => best = Some((node, distance)),
            }
        }
        best.map(|(node, _)| node)
    }
}

fn default_nodes() -> Vec<Node> {
    vec![
        // Core "Origin" Data Centers
        Node::new("core-lockport", "Lockport, NY", 43.1706, -78.6946, Tier::Core),
        Node::new("core-quincy", "Quincy, WA", 47.2343, -119.8526, Tier::Core),
        Node::new("core-omaha", "Omaha, NE", 41.2565, -95.9345, Tier::Core),
        Node::new("core-singapore", "Singapore (SG3)", 1.3521, 103.8198, Tier::Core),
        // Edge PoPs
        Node::new("edge-ashburn", "Ashburn, VA", 39.0438, -77.4874, Tier::Edge),
        Node::new("edge-sunnyvale", "Sunnyvale, CA", 37.3688, -122.0363, Tier::Edge),
        Node::new("edge-seattle", "Seattle, WA", 47.6062, -122.3321, Tier::Edge),
        Node::new("edge-losangeles", "Los Angeles, CA", 34.0522, -118.2437, Tier::Edge),
        Node::new("edge-phoenix", "Phoenix, AZ", 33.4484, -112.0740, Tier::Edge),
        Node::new("edge-atlanta", "Atlanta, GA", 33.7490, -84.3880, Tier::Edge),
        Node::new("edge-miami", "Miami, FL", 25.7617, -80.1918, Tier::Edge),
        Node::new("edge-dallas", "Dallas, TX", 32.7767, -96.7970, Tier::Edge),
        Node::new("edge-chicago", "Chicago, IL", 41.8781, -87.6298, Tier::Edge),
        Node::new("edge-minneapolis", "Minneapolis, MN", 44.9778, -93.2650, Tier::Edge),
        Node::new("edge-denver", "Denver, CO", 39.7392, -104.9903, Tier::Edge),
        Node::new("edge-tokyo", "Tokyo, JP", 35.6762, 139.6503, Tier::Edge),
        Node::new("edge-hongkong", "Hong Kong", 22.3193, 114.1694, Tier::Edge),
        Node::new("edge-sydney", "Sydney, AU", -33.8688, 151.2093, Tier::Edge),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_cores_equidistant() -> NodeRegistry {
        // Both cores are exactly 1° of longitude from the origin on the equator
        NodeRegistry::new(vec![
            Node::new("edge-a", "A", 0.0, 0.0, Tier::Edge),
            Node::new("core-east", "East", 0.0, 1.0, Tier::Core),
            Node::new("core-west", "West", 0.0, -1.0, Tier::Core),
        ])
        .unwrap()
    }

    #[test]
    fn test_default_topology_partition() {
        let registry = NodeRegistry::default_topology();
        assert_eq!(registry.len(), 18);
        assert_eq!(registry.count(Tier::Core), 4);
        assert_eq!(registry.count(Tier::Edge), 14);
    }

    #[test]
    fn test_default_topology_ids_unique() {
        let registry = NodeRegistry::default_topology();
        let rebuilt = NodeRegistry::new(registry.all_nodes().to_vec());
        assert!(rebuilt.is_ok());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = NodeRegistry::new(vec![
            Node::new("x", "one", 0.0, 0.0, Tier::Edge),
            Node::new("x", "two", 1.0, 1.0, Tier::Core),
        ]);
        assert!(matches!(result, Err(RegistryError::DuplicateNode(id)) if id == "x"));
    }

    #[test]
    fn test_tier_filter_preserves_load_order() {
        let registry = NodeRegistry::default_topology();
        let cores: Vec<&str> = registry.nodes_of_tier(Tier::Core).map(|n| n.id.as_str()).collect();
        assert_eq!(cores, vec!["core-lockport", "core-quincy", "core-omaha", "core-singapore"]);

        let edges = registry.edge_nodes();
        assert_eq!(edges.first().map(|n| n.id.as_str()), Some("edge-ashburn"));
        assert_eq!(edges.last().map(|n| n.id.as_str()), Some("edge-sydney"));
    }

    #[test]
    fn test_nearest_core_for_known_edges() {
        let registry = NodeRegistry::default_topology();
        let nearest = |id: &str| {
            let edge = registry.get(id).unwrap();
            registry.nearest_core(edge.position()).unwrap().id.clone()
        };

        assert_eq!(nearest("edge-ashburn"), "core-lockport");
        assert_eq!(nearest("edge-seattle"), "core-quincy");
        assert_eq!(nearest("edge-dallas"), "core-omaha");
        assert_eq!(nearest("edge-hongkong"), "core-singapore");
        assert_eq!(nearest("edge-sydney"), "core-singapore");
    }

    #[test]
    fn test_nearest_core_tie_breaks_on_load_order() {
        let registry = two_cores_equidistant();
        for _ in 0..3 {
            let core = registry.nearest_core(LatLng::new(0.0, 0.0)).unwrap();
            assert_eq!(core.id, "core-east");
        }
    }

    #[test]
    fn test_nearest_core_none_without_cores() {
        let registry = NodeRegistry::new(vec![Node::new("edge-b", "B", 1.0, 1.0, Tier::Edge)]).unwrap();
        assert!(registry.nearest_core(LatLng::new(1.0, 1.0)).is_none());
        assert!(NodeRegistry::empty().nearest_core(LatLng::new(0.0, 0.0)).is_none());
    }

    #[test]
    fn test_lookup_and_edge_check() {
        let registry = NodeRegistry::default_topology();
        assert_eq!(registry.get("edge-tokyo").map(|n| n.name.as_str()), Some("Tokyo, JP"));
        assert!(registry.get("edge-mars").is_none());
        assert!(registry.is_known_edge("edge-tokyo"));
        assert!(!registry.is_known_edge("core-omaha"));
        assert!(!registry.is_known_edge("edge-mars"));
    }

    #[test]
    fn test_json_wire_shape() {
        let json = r#"[
            {"id": "core-a", "name": "A", "lat": 0.0, "lng": 0.0, "type": "core"},
            {"id": "edge-b", "name": "B", "lat": 1, "lng": 1, "type": "edge"}
        ]"#;
        let registry = NodeRegistry::from_json_str(json).unwrap();
        assert_eq!(registry.get("core-a").unwrap().tier, Tier::Core);
        assert_eq!(registry.get("edge-b").unwrap().position(), LatLng::new(1.0, 1.0));

        let encoded = serde_json::to_value(registry.get("edge-b").unwrap()).unwrap();
        assert_eq!(encoded["type"], "edge");
    }

    #[test]
    fn test_json_rejects_unknown_tier() {
        let json = r#"[{"id": "x", "name": "X", "lat": 0, "lng": 0, "type": "regional"}]"#;
        assert!(matches!(NodeRegistry::from_json_str(json), Err(RegistryError::Json(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = NodeRegistry::from_json_file("/nonexistent/georoute/nodes.json");
        assert!(matches!(result, Err(RegistryError::Io(_))));
    }

    #[test]
    fn test_tier_labels() {
        assert_eq!(Tier::Core.label(), "Core Origin Data Center");
        assert_eq!(Tier::Edge.label(), "Edge Point of Presence");
        assert_eq!(Tier::Edge.to_string(), "edge");
    }
}
