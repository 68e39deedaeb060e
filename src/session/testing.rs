//! Session fixtures shared by unit tests.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::config::SessionConfig;
use crate::keystore::MemoryKeyStore;
use crate::transport::mock::{MockConnector, MockPeer};

use super::{Session, SessionListener, State};

/// Lifecycle event captured by [`Recorder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Recorded {
    State(State, State),
    Error(String),
    RegistrationFailed(String),
}

/// Listener forwarding every notification to a channel.
pub(crate) struct Recorder {
    events: mpsc::UnboundedSender<Recorded>,
}

impl Recorder {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Recorded>) {
        let (events, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { events }), rx)
    }
}

impl SessionListener for Recorder {
    fn on_state_changed(&self, old: State, new: State) {
        let _ = self.events.send(Recorded::State(old, new));
    }

    fn on_error(&self, message: &str) {
        let _ = self.events.send(Recorded::Error(message.to_string()));
    }

    fn on_registration_failed(&self, message: &str) {
        let _ = self.events.send(Recorded::RegistrationFailed(message.to_string()));
    }
}

/// Builds a session on a mock connector.
pub(crate) fn harness() -> (
    Session,
    Arc<MockConnector>,
    mpsc::UnboundedReceiver<MockPeer>,
    Arc<MemoryKeyStore>,
) {
    let config = SessionConfig::for_host("192.168.2.119").expect("valid config");
    let keys = Arc::new(MemoryKeyStore::new());
    let (connector, peers) = MockConnector::new();
    let session = Session::with_connector(config, keys.clone(), connector.clone())
        .expect("valid session");
    (session, connector, peers, keys)
}

/// Polls `condition` until it holds, failing after one second.
pub(crate) async fn wait_until(condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

/// Plays the TV side of `hello` / `register` / `registered`.
pub(crate) async fn handshake(session: &Session, peer: &mut MockPeer, key: &str) {
    let hello = peer.next_frame().await;
    assert_eq!(hello["type"], "hello");
    peer.push(r#"{"type":"hello","payload":{"protocolVersion":1,"deviceOS":"webOS"}}"#);

    let register = peer.next_frame().await;
    assert_eq!(register["type"], "register");
    let id = &register["id"];
    peer.push(&format!(
        r#"{{"type":"registered","id":{id},"payload":{{"client-key":"{key}"}}}}"#
    ));

    wait_until(|| session.state() == State::Registered).await;
}

/// Returns a session already registered with a mock TV.
pub(crate) async fn connected() -> (Session, MockPeer) {
    let (session, _connector, mut peers, _keys) = harness();
    session.connect();
    let mut peer = peers.recv().await.expect("link opened");
    handshake(&session, &mut peer, "test-key").await;
    (session, peer)
}
