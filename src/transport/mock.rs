//! Channel-backed connector for tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;
use url::Url;

use crate::error::{Error, Result};

use super::{Connector, Link, LinkEvent};

/// Far end of a mock link, held by the test.
pub(crate) struct MockPeer {
    /// Url the session connected to.
    pub url: Url,
    /// Frames written by the session.
    pub sent: mpsc::UnboundedReceiver<String>,
    /// Injects inbound events.
    pub events: mpsc::UnboundedSender<LinkEvent>,
}

impl MockPeer {
    /// Injects an inbound text frame.
    pub fn push(&self, frame: &str) {
        let _ = self.events.send(LinkEvent::Message(frame.to_string()));
    }

    /// Simulates the TV closing the socket.
    pub fn close(&self) {
        let _ = self.events.send(LinkEvent::Closed);
    }

    /// Waits for the next frame written by the session.
    pub async fn next_frame(&mut self) -> serde_json::Value {
        let text = self.sent.recv().await.expect("session sent a frame");
        serde_json::from_str(&text).expect("frame is json")
    }

    /// Returns a frame already written, if any.
    pub fn try_frame(&mut self) -> Option<serde_json::Value> {
        self.sent
            .try_recv()
            .ok()
            .map(|text| serde_json::from_str(&text).expect("frame is json"))
    }
}

/// Connector that hands each new link's far end to the test.
pub(crate) struct MockConnector {
    attempts: AtomicUsize,
    fail: AtomicBool,
    peers: mpsc::UnboundedSender<MockPeer>,
}

impl MockConnector {
    /// Creates the connector and the receiver of connected peers.
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<MockPeer>) {
        let (peers, rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            attempts: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            peers,
        });
        (connector, rx)
    }

    /// Makes subsequent connection attempts fail.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Returns the number of connection attempts.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, url: &Url) -> Result<Link> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::connection("connection refused"));
        }

        let (outgoing, sent) = mpsc::unbounded_channel();
        let (events, incoming) = mpsc::unbounded_channel();
        let _ = self.peers.send(MockPeer {
            url: url.clone(),
            sent,
            events,
        });

        Ok(Link { outgoing, incoming })
    }
}
