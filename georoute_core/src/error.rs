//! Error types for the route engine.
//!
//! None of these are fatal to a running session: protocol and ingest errors
//! are logged and the offending event is dropped. Registry and config errors
//! can only occur while a session is being set up.

use thiserror::Error;

/// A feed message that could not be turned into a routing decision.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Not JSON, or JSON that does not match the routing-decision shape
    #[error("Malformed feed message: {0}")]
    Json(#[from] serde_json::Error),

    /// Well-formed message of a type this engine does not consume
    #[error("Unexpected message type: {0}")]
    UnexpectedType(String),

    /// Object without a string `type` field
    #[error("Feed message has no type")]
    MissingType,
}

/// A routing decision rejected at ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    /// The decision names a node id that is not in the registry
    #[error("Unknown node: {0}")]
    UnknownNode(String),

    /// The decision targets a node that is not an edge PoP
    #[error("Node {0} is not an edge node")]
    NotEdge(String),
}

/// Failure to load the node registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Two nodes share an id
    #[error("Duplicate node id: {0}")]
    DuplicateNode(String),

    #[error("Failed to read node file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid node definition: {0}")]
    Json(#[from] serde_json::Error),
}

/// Invalid engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A duration that drives a timer must be non-zero
    #[error("{0} must be greater than zero")]
    InvalidDuration(&'static str),

    /// Pruning before the visibility window would hide visible routes
    #[error("Retention ({retention_ms}ms) is shorter than the visibility window ({window_ms}ms)")]
    RetentionBelowWindow { retention_ms: u128, window_ms: u128 },

    /// A path needs at least its two endpoints
    #[error("Geodesic paths need at least 2 points, got {0}")]
    TooFewPathPoints(usize),

    #[error("Geodesic paths take at most {max} points, got {points}")]
    TooManyPathPoints { points: usize, max: usize },
}
