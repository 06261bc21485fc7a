//! Error types for the simulation harness.

use georoute_core::{ConfigError, RegistryError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("Invalid engine configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid node topology: {0}")]
    Registry(#[from] RegistryError),

    #[error("Export encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Export failed: {0}")]
    Export(#[from] std::io::Error),
}
