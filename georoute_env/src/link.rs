//! Channel pair connecting a session to whatever drives the feed socket.

use crate::error::EnvError;
use tokio::sync::mpsc;

/// Session side of an open feed connection.
///
/// Text frames are exchanged over unbounded channels so that sending never
/// blocks the session's event loop. The transport side (`FeedPeer`) owns the
/// actual socket (or simulated peer) and pumps frames in both directions.
///
/// # Lifecycle
///
/// - `recv()` returns `None` once the transport side has gone away
///   (socket closed, error, or simulated severance).
/// - Dropping the `FeedLink` closes the outbound channel, which tells the
///   transport side to shut the connection down.
#[derive(Debug)]
pub struct FeedLink {
    /// Frames headed to the remote end
    outbound: mpsc::UnboundedSender<String>,

    /// Frames received from the remote end
    inbound: mpsc::UnboundedReceiver<String>,
}

/// Transport side of an open feed connection.
#[derive(Debug)]
pub struct FeedPeer {
    /// Deliver frames to the session
    pub inbound: mpsc::UnboundedSender<String>,

    /// Frames the session wants sent
    pub outbound: mpsc::UnboundedReceiver<String>,
}

impl FeedLink {
    /// Creates a connected link/peer pair.
    pub fn pair() -> (FeedLink, FeedPeer) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        let link = FeedLink {
            outbound: outbound_tx,
            inbound: inbound_rx,
        };
        let peer = FeedPeer {
            inbound: inbound_tx,
            outbound: outbound_rx,
        };
        (link, peer)
    }

    /// Queues a text frame for sending. Never blocks.
    ///
    /// # Returns
    /// * `Err(EnvError::Closed)` - the transport side has shut down
    pub fn send(&self, text: String) -> Result<(), EnvError> {
        self.outbound.send(text).map_err(|_| EnvError::Closed)
    }

    /// Receives the next text frame, or `None` once the connection is gone.
    pub async fn recv(&mut self) -> Option<String> {
        self.inbound.recv().await
    }

    /// Returns true if the transport side has dropped its receiver.
    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_link_round_trip() {
        let (mut link, mut peer) = FeedLink::pair();

        link.send("hello".to_string()).unwrap();
        assert_eq!(peer.outbound.recv().await.as_deref(), Some("hello"));

        peer.inbound.send("world".to_string()).unwrap();
        assert_eq!(link.recv().await.as_deref(), Some("world"));
    }

    #[tokio::test]
    async fn test_dropping_peer_closes_link() {
        let (mut link, peer) = FeedLink::pair();
        drop(peer);

        assert!(link.recv().await.is_none());
        assert!(link.is_closed());
        assert!(matches!(link.send("late".to_string()), Err(EnvError::Closed)));
    }

    #[tokio::test]
    async fn test_dropping_link_ends_peer_outbound() {
        let (link, mut peer) = FeedLink::pair();
        drop(link);

        assert!(peer.outbound.recv().await.is_none());
    }
}
