//! Async driver: runs a `Session` as a single tokio task.
//!
//! The task owns the session and `select!`s over four event sources:
//!
//! 1. an in-flight transport `open()` (raced so `stop` works while connecting)
//! 2. inbound frames on the open feed link
//! 3. user commands from the `SessionHandle`
//! 4. one context sleep until the session's next deadline (tick or reconnect)
//!
//! After every event the outbox is flushed to the link and a fresh snapshot
//! is published on a watch channel.

use crate::projector::Snapshot;
use crate::session::{Session, SessionCommand};
use georoute_env::{EnvError, FeedLink, FeedTransport, RouteContext};
use std::future::{pending, Future};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};

type OpenFuture = Pin<Box<dyn Future<Output = Result<FeedLink, EnvError>> + Send>>;

/// Control handle for a spawned session.
///
/// Dropping the handle stops the session as well.
#[derive(Debug)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
    snapshots: watch::Receiver<Snapshot>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Delivers a command. Returns false if the session has already stopped.
    pub fn send(&self, command: SessionCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    /// A receiver that observes every published snapshot.
    pub fn snapshots(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    /// Most recently published snapshot.
    pub fn latest(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops the session and waits for its task to exit.
    pub async fn stop(self) {
        let _ = self.commands.send(SessionCommand::Stop);
        if let Err(e) = self.task.await {
            warn!(error = %e, "session task ended abnormally");
        }
    }
}

/// Starts `session` on the current tokio runtime, feeding it from `transport`.
pub fn spawn_session<Ctx, T>(session: Session<Ctx>, transport: Arc<T>) -> SessionHandle
where
    Ctx: RouteContext,
    T: FeedTransport,
{
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (snapshots_tx, snapshots_rx) = watch::channel(session.snapshot());

    let span = info_span!("session", feed = %transport.endpoint());
    let task = tokio::spawn(run(session, transport, commands_rx, snapshots_tx).instrument(span));

    SessionHandle {
        commands: commands_tx,
        snapshots: snapshots_rx,
        task,
    }
}

fn open<T: FeedTransport>(transport: &Arc<T>) -> OpenFuture {
    let transport = transport.clone();
    Box::pin(async move { transport.open().await })
}

async fn next_open(opening: &mut Option<OpenFuture>) -> Result<FeedLink, EnvError> {
    match opening {
        Some(fut) => fut.await,
        None => pending().await,
    }
}

async fn next_message(link: &mut Option<FeedLink>) -> Option<String> {
    match link {
        Some(link) => link.recv().await,
        None => pending().await,
    }
}

async fn sleep_until<Ctx: RouteContext>(context: &Ctx, wait: Option<Duration>) {
    match wait {
        Some(wait) => context.sleep(wait).await,
        None => pending().await,
    }
}

async fn run<Ctx, T>(
    mut session: Session<Ctx>,
    transport: Arc<T>,
    mut commands: mpsc::UnboundedReceiver<SessionCommand>,
    snapshots: watch::Sender<Snapshot>,
) where
    Ctx: RouteContext,
    T: FeedTransport,
{
    let context = session.context().clone();
    let mut link: Option<FeedLink> = None;
    let mut opening: Option<OpenFuture> = None;

    if session.start() {
        opening = Some(open(&transport));
    }
    snapshots.send_replace(session.snapshot());

    loop {
        let wait = session
            .next_deadline()
            .map(|deadline| deadline.saturating_sub(context.now()));

        tokio::select! {
            result = next_open(&mut opening) => {
                opening = None;
                match result {
                    Ok(opened) => {
                        link = Some(opened);
                        session.on_feed_open();
                    }
                    Err(e) => {
                        warn!(error = %e, "feed: connection attempt failed");
                        session.on_feed_closed();
                    }
                }
            }
            frame = next_message(&mut link) => {
                match frame {
                    Some(text) => {
                        session.on_feed_message(&text);
                    }
                    None => {
                        info!("feed: connection closed");
                        link = None;
                        session.on_feed_closed();
                    }
                }
            }
            command = commands.recv() => {
                match command {
                    Some(command) => {
                        if !session.apply(command) {
                            break;
                        }
                    }
                    None => {
                        debug!("all session handles dropped");
                        break;
                    }
                }
            }
            _ = sleep_until(context.as_ref(), wait) => {
                if session.poll_reconnect() {
                    opening = Some(open(&transport));
                }
                session.poll_tick();
            }
        }

        for frame in session.take_outbox() {
            let sent = link.as_ref().map(|l| l.send(frame).is_ok()).unwrap_or(false);
            if !sent {
                debug!("feed: outbound frame dropped, link closed");
            }
        }
        snapshots.send_replace(session.snapshot());
    }

    session.stop();
    drop(opening);
    drop(link);
    snapshots.send_replace(session.snapshot());
}
