//! Production implementation of RouteContext using Tokio.

use crate::RouteContext;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::time::Instant;
use uuid::Uuid;

/// Production context backed by Tokio and OS entropy.
///
/// Time is read from `tokio::time::Instant`, so a paused test runtime
/// (`#[tokio::test(start_paused = true)]`) drives it deterministically.
pub struct TokioContext {
    /// Start time for monotonic duration calculations
    start: Instant,
}

impl TokioContext {
    /// Creates a new TokioContext.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Creates an Arc-wrapped context for sharing across tasks.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Default for TokioContext {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RouteContext for TokioContext {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn generate_id(&self) -> Uuid {
        Uuid::new_v4()
    }

    fn seed(&self) -> u64 {
        // Production is not seeded
        0
    }
}
