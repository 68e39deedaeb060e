//! WebSocket connector and frame pump.
//!
//! # Event Loop
//!
//! Each open socket gets a tokio task that handles:
//!
//! - Incoming text frames from the TV, forwarded as [`LinkEvent::Message`]
//! - Outgoing frames from the session, written as text messages
//! - Socket shutdown when the session drops its sender
//!
//! The loop always finishes by emitting [`LinkEvent::Closed`].

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use rustls::ClientConfig;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{
    Connector as TlsConnector, MaybeTlsStream, WebSocketStream, connect_async_tls_with_config,
};
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{Error, Result};

use super::{Connector, Link, LinkEvent, tls};

// ============================================================================
// Types
// ============================================================================

/// Client socket, plain or TLS.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// WsConnector
// ============================================================================

/// Connector for real TV sockets (`ws://` and `wss://`).
#[derive(Clone)]
pub struct WsConnector {
    tls: Arc<ClientConfig>,
}

impl std::fmt::Debug for WsConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsConnector").finish_non_exhaustive()
    }
}

impl WsConnector {
    /// Creates a connector.
    ///
    /// # Arguments
    ///
    /// * `accept_invalid_certs` - Trust the TV's self-signed certificate
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tls`] if the TLS configuration cannot be built.
    pub fn new(accept_invalid_certs: bool) -> Result<Self> {
        Ok(Self {
            tls: tls::client_config(accept_invalid_certs)?,
        })
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &Url) -> Result<Link> {
        debug!(%url, "Connecting");

        let (ws_stream, _response) = connect_async_tls_with_config(
            url.as_str(),
            None,
            false,
            Some(TlsConnector::Rustls(Arc::clone(&self.tls))),
        )
        .await
        .map_err(|e| Error::connection(format!("{url}: {e}")))?;

        debug!(%url, "WebSocket connected");

        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
        let (incoming_tx, incoming) = mpsc::unbounded_channel();

        tokio::spawn(run_event_loop(ws_stream, outgoing_rx, incoming_tx));

        Ok(Link { outgoing, incoming })
    }
}

// ============================================================================
// Event Loop
// ============================================================================

/// Pumps frames until either side closes.
async fn run_event_loop(
    ws_stream: WsStream,
    mut outgoing_rx: mpsc::UnboundedReceiver<String>,
    incoming_tx: mpsc::UnboundedSender<LinkEvent>,
) {
    let (mut ws_write, mut ws_read) = ws_stream.split();

    loop {
        tokio::select! {
            // Incoming frames from the TV
            message = ws_read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        trace!(frame = %text, "Message [in]");
                        if incoming_tx.send(LinkEvent::Message(text.to_string())).is_err() {
                            debug!("Session dropped the link");
                            let _ = ws_write.close().await;
                            break;
                        }
                    }

                    Some(Ok(Message::Close(frame))) => {
                        debug!(?frame, "WebSocket closed by remote");
                        break;
                    }

                    Some(Err(e)) => {
                        let error = Error::WebSocket(e);
                        warn!(%error, "WebSocket error");
                        let _ = incoming_tx.send(LinkEvent::Error(error.to_string()));
                        break;
                    }

                    None => {
                        debug!("WebSocket stream ended");
                        break;
                    }

                    // Ignore Binary, Ping, Pong
                    _ => {}
                }
            }

            // Frames from the session
            frame = outgoing_rx.recv() => {
                match frame {
                    Some(text) => {
                        trace!(frame = %text, "Message [out]");
                        if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                            let error = Error::from(e);
                            warn!(%error, "Unable to send message");
                            let _ = incoming_tx.send(LinkEvent::Error(error.to_string()));
                            break;
                        }
                    }

                    None => {
                        debug!("Outgoing channel closed, closing socket");
                        let _ = ws_write.close().await;
                        break;
                    }
                }
            }
        }
    }

    let _ = incoming_tx.send(LinkEvent::Closed);
    debug!("Event loop terminated");
}

// ============================================================================
// Tests
// ============================================================================
