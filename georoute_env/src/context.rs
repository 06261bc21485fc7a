//! Core environment context trait for GeoRoute sessions.

use async_trait::async_trait;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

/// The central interface for Environment Interaction.
///
/// This trait abstracts the "real world" so that the route engine can run
/// in both production (tokio) and simulation (virtual clock) environments.
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::time`, random UUIDs
/// - **Simulation**: `SimContext` - manually advanced clock, seeded ids
///
/// # Determinism
///
/// Route timestamps, visibility windows and the reconnect delay are all
/// measured on `now()`. Nothing in the engine reads the OS clock directly.
#[async_trait]
pub trait RouteContext: Send + Sync + 'static {
    /// Returns the current monotonic time since context creation.
    ///
    /// Route `created_at` stamps and every timer deadline use this clock.
    fn now(&self) -> Duration;

    /// Returns the wall-clock time (for logs and exported frames).
    fn system_time(&self) -> SystemTime;

    /// Suspends execution for the given duration.
    ///
    /// In production: wraps `tokio::time::sleep`
    /// In simulation: advances virtual clock
    async fn sleep(&self, duration: Duration);

    /// Generates a fresh identifier for session-owned objects (simulated users).
    ///
    /// Production draws from OS entropy; simulation derives ids from the seed
    /// so that runs are reproducible.
    fn generate_id(&self) -> Uuid;

    /// Returns the context's seed (for logging/debugging).
    ///
    /// In production, returns 0 (not seeded).
    fn seed(&self) -> u64;
}
