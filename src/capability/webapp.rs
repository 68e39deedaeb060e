//! Peer-to-peer messages to and from web apps running on the TV.
//!
//! Outbound p2p frames carry no request id, so [`send_p2p`] cannot correlate
//! the TV's reply: its listener is told `Ok(Value::Null)` once the frame has
//! been handed to the session.
//!
//! Media commands (`seek`, `getPosition`, ...) ride on top of p2p. Each one
//! carries a `reqN` request id, and the player inside the web app answers
//! with a `connectsdk.mediaCommandResponse` message echoing it. Inbound
//! messages without a `contentType` are passed to the [`WebAppListener`].
//!
//! [`send_p2p`]: WebAppMessaging::send_p2p

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::command::{Command, ResponseListener, ignore, raw_payload};
use crate::error::{Error, Result};
use crate::protocol::PlayState;
use crate::session::P2pHandler;

use super::{WebOsTv, reject};

/// Endpoint recorded on p2p commands; never sent, the payload is.
const P2P_TARGET: &str = "p2p";

/// Prefix of structured web app message types.
const CONTENT_TYPE_PREFIX: &str = "connectsdk.";

const MEDIA_COMMAND: &str = "connectsdk.mediaCommand";
const MEDIA_COMMAND_RESPONSE: &str = "mediaCommandResponse";

// ============================================================================
// WebAppListener
// ============================================================================

/// Receives plain messages sent by web apps.
pub trait WebAppListener: Send + Sync {
    /// Called with the sending app id and the message (object or string).
    fn on_message(&self, from: &str, message: &Value);
}

// ============================================================================
// WebAppRouter
// ============================================================================

/// Correlates media command responses and forwards other web app messages.
#[derive(Default)]
pub(crate) struct WebAppRouter {
    next_request_id: AtomicU32,
    pending: Mutex<FxHashMap<String, ResponseListener<Value>>>,
    listener: RwLock<Option<Arc<dyn WebAppListener>>>,
}

impl WebAppRouter {
    fn next_request_id(&self) -> String {
        format!("req{}", self.next_request_id.fetch_add(1, Ordering::Relaxed))
    }

    fn track(&self, request_id: String, listener: ResponseListener<Value>) {
        self.pending.lock().insert(request_id, listener);
    }

    /// Number of media commands waiting for the web app's answer.
    pub(crate) fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Fails every outstanding media command with [`Error::ConnectionClosed`].
    pub(crate) fn reset(&self) {
        let pending: Vec<_> = self.pending.lock().drain().map(|(_, l)| l).collect();
        if !pending.is_empty() {
            debug!(count = pending.len(), "Dropping unanswered media commands");
        }
        for listener in pending {
            listener(Err(Error::ConnectionClosed));
        }
    }

    fn on_media_response(&self, response: &Value) {
        let Some(request_id) = response
            .get("requestId")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
        else {
            debug!("Media command response without request id");
            return;
        };

        let Some(listener) = self.pending.lock().remove(request_id) else {
            debug!(request_id, "No media command waiting for response");
            return;
        };

        match response
            .get("error")
            .and_then(Value::as_str)
            .filter(|e| !e.is_empty())
        {
            Some(error) => listener(Err(Error::device(error))),
            None => listener(Ok(response.clone())),
        }
    }

    fn forward(&self, from: &str, message: &Value) {
        let listener = self.listener.read().clone();
        match listener {
            Some(listener) => listener.on_message(from, message),
            None => debug!(from, "No web app listener installed"),
        }
    }
}

impl P2pHandler for WebAppRouter {
    fn on_p2p_message(&self, from: &str, payload: &Value) {
        match payload {
            Value::Object(message) => {
                let Some(content_type) = message.get("contentType").and_then(Value::as_str) else {
                    self.forward(from, payload);
                    return;
                };
                match content_type.strip_prefix(CONTENT_TYPE_PREFIX) {
                    Some(MEDIA_COMMAND_RESPONSE) => match message.get(MEDIA_COMMAND_RESPONSE) {
                        Some(response) => self.on_media_response(response),
                        None => warn!(from, "Media command response without body"),
                    },
                    Some(kind) => debug!(from, kind, "Ignoring web app media event"),
                    None => debug!(from, content_type, "Ignoring web app message"),
                }
            }
            Value::String(_) => self.forward(from, payload),
            _ => debug!(from, "Ignoring non-object web app message"),
        }
    }
}

// ============================================================================
// WebAppMessaging
// ============================================================================

/// Messaging to web apps launched on the TV.
pub trait WebAppMessaging {
    /// Sends `message` to the web app `to`.
    ///
    /// An empty target or a null/empty message is rejected.
    fn send_p2p(&self, to: &str, message: Value, listener: ResponseListener<Value>);

    /// Asks the media player inside web app `to` to seek.
    ///
    /// The listener receives the player's response. Negative positions are
    /// rejected.
    fn seek(&self, to: &str, position_ms: i64, listener: ResponseListener<Value>);

    /// Reads the player position in milliseconds.
    fn get_position(&self, to: &str, listener: ResponseListener<i64>);

    /// Reads the media duration in milliseconds.
    fn get_duration(&self, to: &str, listener: ResponseListener<i64>);

    /// Reads the player state.
    fn get_play_state(&self, to: &str, listener: ResponseListener<PlayState>);

    /// Installs the receiver of plain web app messages.
    fn set_web_app_listener(&self, listener: Arc<dyn WebAppListener>);

    /// Removes the web app message receiver.
    fn clear_web_app_listener(&self);
}

fn is_empty_message(message: &Value) -> bool {
    match message {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Reads a seconds field as milliseconds.
fn millis(response: &Value, key: &str) -> Result<i64> {
    let value = crate::protocol::required_field(response, key)?;
    if let Some(seconds) = value.as_i64() {
        return Ok(seconds * 1000);
    }
    value
        .as_f64()
        .map(|seconds| (seconds * 1000.0).round() as i64)
        .ok_or_else(|| Error::payload(format!("field '{key}' is not a number")))
}

fn play_state(response: &Value) -> Result<PlayState> {
    crate::protocol::required_field(response, "playState")?
        .as_str()
        .map(PlayState::parse)
        .ok_or_else(|| Error::payload("field 'playState' is not a string"))
}

impl WebOsTv {
    /// Sends a media command and routes the player's answer to `listener`.
    fn media_command<X: 'static>(
        &self,
        to: &str,
        command_type: &str,
        mut command: Map<String, Value>,
        convert: fn(&Value) -> Result<X>,
        listener: ResponseListener<X>,
    ) {
        if to.is_empty() {
            reject(&listener, "p2p target must not be empty");
            return;
        }

        let request_id = self.web_apps().next_request_id();
        command.insert("type".to_string(), Value::from(command_type));
        command.insert("requestId".to_string(), Value::from(request_id.as_str()));

        self.web_apps().track(
            request_id,
            Arc::new(move |result: Result<Value>| {
                let result = result.and_then(|response| convert(&response));
                if let Err(Error::Payload { message }) = &result {
                    warn!(error = %message, "Unexpected media command response");
                }
                listener(result);
            }),
        );

        let message = json!({
            "contentType": MEDIA_COMMAND,
            "mediaCommand": command,
        });
        self.send_p2p(to, message, ignore());
    }
}

impl WebAppMessaging for WebOsTv {
    fn send_p2p(&self, to: &str, message: Value, listener: ResponseListener<Value>) {
        if to.is_empty() {
            reject(&listener, "p2p target must not be empty");
            return;
        }
        if is_empty_message(&message) {
            reject(&listener, "p2p message must not be empty");
            return;
        }

        let payload = json!({
            "type": "p2p",
            "to": to,
            "payload": message,
        });
        debug!(to, "Sending p2p message");
        self.session().send_command(Arc::new(Command::new(
            P2P_TARGET,
            Some(payload),
            raw_payload(),
            ignore(),
        )));
        listener(Ok(Value::Null));
    }

    fn seek(&self, to: &str, position_ms: i64, listener: ResponseListener<Value>) {
        if position_ms < 0 {
            reject(&listener, "seek position must not be negative");
            return;
        }

        let mut command = Map::new();
        command.insert("position".to_string(), Value::from(position_ms / 1000));
        self.media_command(to, "seek", command, |r| Ok(r.clone()), listener);
    }

    fn get_position(&self, to: &str, listener: ResponseListener<i64>) {
        self.media_command(to, "getPosition", Map::new(), |r| millis(r, "position"), listener);
    }

    fn get_duration(&self, to: &str, listener: ResponseListener<i64>) {
        self.media_command(to, "getDuration", Map::new(), |r| millis(r, "duration"), listener);
    }

    fn get_play_state(&self, to: &str, listener: ResponseListener<PlayState>) {
        self.media_command(to, "getPlayState", Map::new(), play_state, listener);
    }

    fn set_web_app_listener(&self, listener: Arc<dyn WebAppListener>) {
        *self.web_apps().listener.write() = Some(listener);
    }

    fn clear_web_app_listener(&self) {
        *self.web_apps().listener.write() = None;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::capability::testing::{recorder, tv};
    use crate::transport::mock::MockPeer;

    /// Replies from the web app as the TV relays it.
    fn reply(peer: &MockPeer, from: &str, payload: Value) {
        let frame = json!({"type": "p2p", "from": from, "payload": payload});
        peer.push(&frame.to_string());
    }

    fn media_response(request_id: &Value, body: Value) -> Value {
        let mut body = body;
        body["requestId"] = request_id.clone();
        json!({
            "contentType": "connectsdk.mediaCommandResponse",
            "mediaCommandResponse": body,
        })
    }

    struct Messages(mpsc::UnboundedSender<(String, Value)>);

    impl WebAppListener for Messages {
        fn on_message(&self, from: &str, message: &Value) {
            let _ = self.0.send((from.to_string(), message.clone()));
        }
    }

    #[tokio::test]
    async fn test_send_p2p_is_sent_verbatim() {
        let (tv, mut peer) = tv().await;
        let (listener, mut results) = recorder();

        tv.send_p2p("com.example.app", json!({"hello": "world"}), listener);

        let frame = peer.next_frame().await;
        assert_eq!(
            frame,
            json!({"type": "p2p", "to": "com.example.app", "payload": {"hello": "world"}})
        );
        assert_eq!(results.recv().await.expect("listener called").expect("ok"), Value::Null);
        assert_eq!(tv.session().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_send_p2p_rejects_empty_arguments() {
        let (tv, mut peer) = tv().await;

        for (to, message) in [("", json!({"a": 1})), ("app", Value::Null), ("app", json!(""))] {
            let (listener, mut results) = recorder();
            tv.send_p2p(to, message, listener);
            assert!(matches!(
                results.recv().await.expect("listener called"),
                Err(Error::InvalidArgument { .. })
            ));
        }

        assert!(peer.try_frame().is_none());
    }

    #[tokio::test]
    async fn test_seek_sends_whole_seconds_and_waits_for_player() {
        let (tv, mut peer) = tv().await;
        let (listener, mut results) = recorder();

        tv.seek("com.example.player", 90_500, listener);

        let frame = peer.next_frame().await;
        assert_eq!(frame["to"], "com.example.player");
        assert_eq!(frame["payload"]["contentType"], "connectsdk.mediaCommand");
        let command = &frame["payload"]["mediaCommand"];
        assert_eq!(command["type"], "seek");
        assert_eq!(command["position"], 90);
        assert_eq!(command["requestId"], "req0");
        assert!(results.try_recv().is_err());

        reply(&peer, "com.example.player", media_response(&command["requestId"], json!({})));

        let response = results.recv().await.expect("listener called").expect("ok");
        assert_eq!(response["requestId"], "req0");
        assert_eq!(tv.web_apps().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_seek_negative_position_is_rejected() {
        let (tv, mut peer) = tv().await;
        let (listener, mut results) = recorder();

        tv.seek("com.example.player", -1, listener);

        assert!(matches!(
            results.recv().await.expect("listener called"),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(peer.try_frame().is_none());
        assert_eq!(tv.web_apps().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_media_queries_convert_responses() {
        let (tv, mut peer) = tv().await;
        let (position, mut positions) = recorder();
        let (duration, mut durations) = recorder();
        let (state, mut states) = recorder();

        tv.get_position("player", position);
        tv.get_duration("player", duration);
        tv.get_play_state("player", state);

        let mut ids = Vec::new();
        for expected in ["getPosition", "getDuration", "getPlayState"] {
            let frame = peer.next_frame().await;
            let command = &frame["payload"]["mediaCommand"];
            assert_eq!(command["type"], expected);
            ids.push(command["requestId"].clone());
        }

        // Answered out of order.
        reply(&peer, "player", media_response(&ids[2], json!({"playState": "paused"})));
        reply(&peer, "player", media_response(&ids[0], json!({"position": 12.25})));
        reply(&peer, "player", media_response(&ids[1], json!({"duration": 3600})));

        assert_eq!(states.recv().await.expect("state").expect("ok"), PlayState::Paused);
        assert_eq!(positions.recv().await.expect("position").expect("ok"), 12_250);
        assert_eq!(durations.recv().await.expect("duration").expect("ok"), 3_600_000);
    }

    #[tokio::test]
    async fn test_media_command_error_reaches_listener() {
        let (tv, mut peer) = tv().await;
        let (listener, mut results) = recorder();

        tv.get_position("player", listener);
        let id = peer.next_frame().await["payload"]["mediaCommand"]["requestId"].clone();
        reply(&peer, "player", media_response(&id, json!({"error": "no media loaded"})));

        let error = results.recv().await.expect("listener called").unwrap_err();
        assert!(error.is_device_error());
    }

    #[tokio::test]
    async fn test_malformed_media_response_is_payload_error() {
        let (tv, mut peer) = tv().await;
        let (listener, mut results) = recorder();

        tv.get_duration("player", listener);
        let id = peer.next_frame().await["payload"]["mediaCommand"]["requestId"].clone();
        reply(&peer, "player", media_response(&id, json!({"duration": "long"})));

        assert!(matches!(
            results.recv().await.expect("listener called"),
            Err(Error::Payload { .. })
        ));
    }

    #[tokio::test]
    async fn test_plain_messages_reach_web_app_listener() {
        let (tv, peer) = tv().await;
        let (tx, mut messages) = mpsc::unbounded_channel();
        tv.set_web_app_listener(Arc::new(Messages(tx)));

        reply(&peer, "com.example.app", json!({"score": 3}));
        reply(&peer, "com.example.app", json!({"contentType": "connectsdk.mediaEvent", "mediaEvent": {}}));
        reply(&peer, "com.example.app", json!("hello"));

        assert_eq!(
            messages.recv().await,
            Some(("com.example.app".to_string(), json!({"score": 3})))
        );
        assert_eq!(
            messages.recv().await,
            Some(("com.example.app".to_string(), json!("hello")))
        );

        tv.clear_web_app_listener();
        reply(&peer, "com.example.app", json!({"score": 4}));
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(messages.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_reset_fails_unanswered_media_commands() {
        let (tv, mut peer) = tv().await;
        let (listener, mut results) = recorder();

        tv.get_play_state("player", listener);
        let _ = peer.next_frame().await;
        assert_eq!(tv.web_apps().pending_count(), 1);

        tv.web_apps().reset();

        assert!(matches!(
            results.recv().await.expect("listener called"),
            Err(Error::ConnectionClosed)
        ));
        assert_eq!(tv.web_apps().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_p2p_buffered_while_offline() {
        let (session, _connector, _peers, _keys) = crate::session::testing::harness();
        let tv = WebOsTv::new(session);

        tv.send_p2p("app", json!({"x": 1}), ignore());

        assert_eq!(tv.session().buffered_count(), 1);
    }
}
