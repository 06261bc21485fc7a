//! Deterministic session scenarios.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// One user, one edge, one core: both hops drawn, then expire
    SingleHop,

    /// Topology without cores: only the user hop is drawn
    NoCore,

    /// Feed down at start and severed later: fixed-delay reconnects
    FeedOutage,

    /// Garbage and rogue frames on the feed are dropped
    MalformedFeed,

    /// Hover pins expired routes; retention only drops deleted users' routes
    HoverPin,

    /// Decision engine answers with nodes the registry rejects
    RogueDecision,

    /// Many users, ping-all, then clear
    GlobalPing,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::SingleHop,
            ScenarioId::NoCore,
            ScenarioId::FeedOutage,
            ScenarioId::MalformedFeed,
            ScenarioId::HoverPin,
            ScenarioId::RogueDecision,
            ScenarioId::GlobalPing,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::SingleHop => "single_hop",
            ScenarioId::NoCore => "no_core",
            ScenarioId::FeedOutage => "feed_outage",
            ScenarioId::MalformedFeed => "malformed_feed",
            ScenarioId::HoverPin => "hover_pin",
            ScenarioId::RogueDecision => "rogue_decision",
            ScenarioId::GlobalPing => "global_ping",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::SingleHop => "user → edge → core paths appear, then age out after 3s",
            ScenarioId::NoCore => "edge-only topology renders the user hop alone",
            ScenarioId::FeedOutage => "unreachable feed retried every 3s, recovers, survives a sever",
            ScenarioId::MalformedFeed => "invalid JSON, unknown types and ghost nodes are dropped",
            ScenarioId::HoverPin => "hovered routes stay visible; retention spares placed users",
            ScenarioId::RogueDecision => "decisions naming core or unknown nodes never enter the ledger",
            ScenarioId::GlobalPing => "ping-all re-requests every user; clear keeps the topology",
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single_hop" | "singlehop" => Ok(ScenarioId::SingleHop),
            "no_core" | "nocore" => Ok(ScenarioId::NoCore),
            "feed_outage" | "feedoutage" => Ok(ScenarioId::FeedOutage),
            "malformed_feed" | "malformedfeed" => Ok(ScenarioId::MalformedFeed),
            "hover_pin" | "hoverpin" => Ok(ScenarioId::HoverPin),
            "rogue_decision" | "roguedecision" => Ok(ScenarioId::RogueDecision),
            "global_ping" | "globalping" => Ok(ScenarioId::GlobalPing),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
