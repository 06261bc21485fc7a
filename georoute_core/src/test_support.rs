//! Manually advanced context for driving a `Session` in unit tests.

use async_trait::async_trait;
use georoute_env::RouteContext;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use uuid::Uuid;

pub(crate) struct ManualContext {
    now: Mutex<Duration>,
    ids: AtomicU64,
}

impl ManualContext {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(Duration::ZERO),
            ids: AtomicU64::new(0),
        })
    }

    pub(crate) fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }

    pub(crate) fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }
}

#[async_trait]
impl RouteContext for ManualContext {
    fn now(&self) -> Duration {
        *self.now.lock().unwrap()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::UNIX_EPOCH + self.now()
    }

    async fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }

    fn generate_id(&self) -> Uuid {
        Uuid::from_u128(self.ids.fetch_add(1, Ordering::SeqCst) as u128 + 1)
    }

    fn seed(&self) -> u64 {
        0
    }
}
