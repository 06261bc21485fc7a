//! Production feed transport over WebSocket.
//!
//! `open()` performs the handshake with tokio-tungstenite, then spawns a pump
//! task that moves text frames between the socket and a `FeedLink`. Each
//! WebSocket text message is one JSON feed message.

use crate::error::EnvError;
use crate::link::{FeedLink, FeedPeer};
use crate::transport::FeedTransport;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMsg;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn, Instrument};
use url::Url;

type WsInner = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket live feed over plain `ws://`.
///
/// The build carries no TLS backend, so `wss://` endpoints are refused up
/// front instead of failing on every reconnect.
#[derive(Debug, Clone)]
pub struct WsFeed {
    url: Url,
}

impl WsFeed {
    /// Creates a feed for the given endpoint.
    ///
    /// Fails with `EnvError::InvalidUrl` if the url does not parse or is not
    /// a plain `ws` url.
    pub fn new(url: &str) -> Result<Self, EnvError> {
        let url = Url::parse(url).map_err(EnvError::invalid_url)?;
        match url.scheme() {
            "ws" => Ok(Self { url }),
            "wss" => Err(EnvError::invalid_url("wss is not supported (no TLS backend)")),
            other => Err(EnvError::invalid_url(format!(
                "unsupported scheme '{other}' (expected ws)"
            ))),
        }
    }

    /// Returns the endpoint url.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl FeedTransport for WsFeed {
    async fn open(&self) -> Result<FeedLink, EnvError> {
        debug!(url = %self.url, "feed: connecting via WebSocket");
        let (stream, _response) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| EnvError::feed(e.to_string()))?;
        info!(url = %self.url, "feed: WebSocket connected");

        let (link, peer) = FeedLink::pair();
        let span = tracing::info_span!("ws_pump", url = %self.url);
        tokio::spawn(pump(stream, peer).instrument(span));
        Ok(link)
    }

    fn endpoint(&self) -> String {
        self.url.to_string()
    }
}

/// Moves frames between the socket and the session until either side ends.
///
/// Exits (dropping `peer.inbound`, which the session sees as close) on:
/// a close frame, end of stream, a socket error, or the link being dropped.
async fn pump(stream: WsInner, mut peer: FeedPeer) {
    let (mut sink, mut source) = stream.split();

    loop {
        tokio::select! {
            outbound = peer.outbound.recv() => match outbound {
                Some(text) => {
                    if let Err(e) = sink.send(WsMsg::Text(text)).await {
                        warn!(error = %e, "feed: send failed");
                        break;
                    }
                }
                None => {
                    debug!("feed: link dropped, closing socket");
                    let _ = sink.close().await;
                    break;
                }
            },
            inbound = source.next() => match inbound {
                Some(Ok(WsMsg::Text(text))) => {
                    if peer.inbound.send(text).is_err() {
                        let _ = sink.close().await;
                        break;
                    }
                }
                Some(Ok(WsMsg::Close(_))) | None => {
                    info!("feed: WebSocket closed by remote");
                    break;
                }
                // Ping/Pong/Binary: tungstenite answers pings internally.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "feed: WebSocket error");
                    break;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_rejects_non_websocket_scheme() {
        let err = WsFeed::new("http://localhost:8000/ws").unwrap_err();
        assert!(matches!(err, EnvError::InvalidUrl(_)));

        let err = WsFeed::new("not a url").unwrap_err();
        assert!(matches!(err, EnvError::InvalidUrl(_)));
    }

    #[test]
    fn test_accepts_ws_only() {
        assert!(WsFeed::new("ws://localhost:8000/ws").is_ok());

        let err = WsFeed::new("wss://example.com/ws").unwrap_err();
        assert!(matches!(err, EnvError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_open_refused_is_feed_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let feed = WsFeed::new(&format!("ws://127.0.0.1:{port}/ws")).unwrap();
        let err = feed.open().await.unwrap_err();
        assert!(matches!(err, EnvError::FeedError(_)));
    }

    #[tokio::test]
    async fn test_text_frames_flow_both_ways() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        // Echo server that uppercases each text frame, then closes.
        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            if let Some(Ok(WsMsg::Text(text))) = ws.next().await {
                ws.send(WsMsg::Text(text.to_uppercase())).await.unwrap();
            }
            let _ = ws.close(None).await;
        });

        let feed = WsFeed::new(&format!("ws://127.0.0.1:{port}/ws")).unwrap();
        let mut link = feed.open().await.unwrap();

        link.send("ping".to_string()).unwrap();
        assert_eq!(link.recv().await.as_deref(), Some("PING"));

        // Remote close ends the link.
        assert!(link.recv().await.is_none());
        server.await.unwrap();
    }
}
