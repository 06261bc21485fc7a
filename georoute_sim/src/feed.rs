//! Simulated feed transport with fault injection.

use crate::decider::{Decider, DeciderMode};
use async_trait::async_trait;
use georoute_env::{EnvError, FeedLink, FeedPeer, FeedTransport};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

/// In-process feed backed by a `Decider`.
///
/// Each `open()` spawns a pump task that answers outbound requests through
/// the decider. The paired `SimFeedController` injects faults.
pub struct SimFeed {
    shared: Arc<Shared>,
}

/// Fault injection handle for a `SimFeed`.
#[derive(Clone)]
pub struct SimFeedController {
    shared: Arc<Shared>,
}

struct Shared {
    /// Whether `open()` succeeds
    reachable: AtomicBool,

    /// Total `open()` calls, successful or not
    opens: AtomicU64,

    decider: Mutex<Decider>,

    /// Every frame the session sent, in order
    sent: Mutex<Vec<String>>,

    /// The live connection, if any
    active: Mutex<Option<ActiveLink>>,
}

struct ActiveLink {
    /// Injects frames into the session's inbound channel
    inbound: mpsc::UnboundedSender<String>,

    /// Dropping this ends the pump task
    _kill: oneshot::Sender<()>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SimFeed {
    /// Creates a reachable feed and its controller.
    pub fn new(decider: Decider) -> (Arc<SimFeed>, SimFeedController) {
        let shared = Arc::new(Shared {
            reachable: AtomicBool::new(true),
            opens: AtomicU64::new(0),
            decider: Mutex::new(decider),
            sent: Mutex::new(Vec::new()),
            active: Mutex::new(None),
        });
        let feed = Arc::new(SimFeed { shared: shared.clone() });
        (feed, SimFeedController { shared })
    }
}

#[async_trait]
impl FeedTransport for SimFeed {
    async fn open(&self) -> Result<FeedLink, EnvError> {
        let attempt = self.shared.opens.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.shared.reachable.load(Ordering::SeqCst) {
            debug!(attempt, "sim feed: refusing connection");
            return Err(EnvError::feed("connection refused (simulated)"));
        }

        let (link, peer) = FeedLink::pair();
        let (kill_tx, kill_rx) = oneshot::channel();
        *lock(&self.shared.active) = Some(ActiveLink {
            inbound: peer.inbound.clone(),
            _kill: kill_tx,
        });

        info!(attempt, "sim feed: connection opened");
        tokio::spawn(pump(self.shared.clone(), peer, kill_rx));
        Ok(link)
    }

    fn endpoint(&self) -> String {
        "sim://decision-engine".to_string()
    }
}

async fn pump(shared: Arc<Shared>, mut peer: FeedPeer, mut kill: oneshot::Receiver<()>) {
    loop {
        tokio::select! {
            _ = &mut kill => {
                debug!("sim feed: connection severed");
                break;
            }
            frame = peer.outbound.recv() => {
                let Some(frame) = frame else {
                    debug!("sim feed: session closed the link");
                    break;
                };
                lock(&shared.sent).push(frame.clone());
                let reply = lock(&shared.decider).respond(&frame);
                if let Some(reply) = reply {
                    if peer.inbound.send(reply).is_err() {
                        break;
                    }
                }
            }
        }
    }
}

impl SimFeedController {
    /// Makes future `open()` calls fail (or succeed again).
    pub fn set_reachable(&self, reachable: bool) {
        self.shared.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Drops the live connection, as a server crash would.
    pub fn sever(&self) -> bool {
        lock(&self.shared.active).take().is_some()
    }

    /// Delivers a raw frame to the session over the live connection.
    ///
    /// Returns false if no connection is open.
    pub fn inject(&self, frame: impl Into<String>) -> bool {
        match lock(&self.shared.active).as_ref() {
            Some(active) => active.inbound.send(frame.into()).is_ok(),
            None => false,
        }
    }

    pub fn set_mode(&self, mode: DeciderMode) {
        lock(&self.shared.decider).set_mode(mode);
    }

    /// Number of `open()` calls so far.
    pub fn opens(&self) -> u64 {
        self.shared.opens.load(Ordering::SeqCst)
    }

    /// Frames the session has sent so far.
    pub fn sent(&self) -> Vec<String> {
        lock(&self.shared.sent).clone()
    }
}
