//! Power and media transport.

use serde_json::Value;

use crate::command::{ResponseListener, raw_payload};

use super::WebOsTv;

const TURN_OFF: &str = "ssap://system/turnOff";
const PLAY: &str = "ssap://media.controls/play";
const PAUSE: &str = "ssap://media.controls/pause";
const STOP: &str = "ssap://media.controls/stop";
const REWIND: &str = "ssap://media.controls/rewind";
const FAST_FORWARD: &str = "ssap://media.controls/fastForward";

// ============================================================================
// PowerControl
// ============================================================================

/// Power state.
///
/// Powering on is not possible over the socket; see [`crate::wol`].
pub trait PowerControl {
    /// Turns the TV off.
    fn power_off(&self, listener: ResponseListener<Value>);
}

impl PowerControl for WebOsTv {
    fn power_off(&self, listener: ResponseListener<Value>) {
        self.request(TURN_OFF, None, raw_payload(), listener);
    }
}

// ============================================================================
// MediaControl
// ============================================================================

/// Transport controls for the playing media.
pub trait MediaControl {
    /// Starts or resumes playback.
    fn play(&self, listener: ResponseListener<Value>);
    /// Pauses playback.
    fn pause(&self, listener: ResponseListener<Value>);
    /// Stops playback.
    fn stop(&self, listener: ResponseListener<Value>);
    /// Rewinds.
    fn rewind(&self, listener: ResponseListener<Value>);
    /// Fast-forwards.
    fn fast_forward(&self, listener: ResponseListener<Value>);
}

impl MediaControl for WebOsTv {
    fn play(&self, listener: ResponseListener<Value>) {
        self.request(PLAY, None, raw_payload(), listener);
    }

    fn pause(&self, listener: ResponseListener<Value>) {
        self.request(PAUSE, None, raw_payload(), listener);
    }

    fn stop(&self, listener: ResponseListener<Value>) {
        self.request(STOP, None, raw_payload(), listener);
    }

    fn rewind(&self, listener: ResponseListener<Value>) {
        self.request(REWIND, None, raw_payload(), listener);
    }

    fn fast_forward(&self, listener: ResponseListener<Value>) {
        self.request(FAST_FORWARD, None, raw_payload(), listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::testing::{answer, recorder, tv};
    use serde_json::json;

    #[tokio::test]
    async fn test_transport_endpoints() {
        let (tv, mut peer) = tv().await;
        let calls: [(fn(&WebOsTv, ResponseListener<Value>), &str); 5] = [
            (<WebOsTv as MediaControl>::play, PLAY),
            (<WebOsTv as MediaControl>::pause, PAUSE),
            (<WebOsTv as MediaControl>::stop, STOP),
            (<WebOsTv as MediaControl>::rewind, REWIND),
            (<WebOsTv as MediaControl>::fast_forward, FAST_FORWARD),
        ];

        for (call, uri) in calls {
            let (listener, _results) = recorder();
            call(&tv, listener);
            assert_eq!(peer.next_frame().await["uri"], uri);
        }
    }

    #[tokio::test]
    async fn test_power_off_acknowledged() {
        let (tv, mut peer) = tv().await;
        let (listener, mut results) = recorder();

        tv.power_off(listener);
        let frame = answer(&mut peer, json!({"returnValue": true})).await;

        assert_eq!(frame["uri"], TURN_OFF);
        let payload = results.recv().await.expect("listener called").expect("ok");
        assert_eq!(payload["returnValue"], true);
    }

    #[tokio::test]
    async fn test_power_off_while_disconnected_is_buffered() {
        let (session, _connector, _peers, _keys) = crate::session::testing::harness();
        let tv = WebOsTv::new(session);

        tv.power_off(crate::command::ignore());

        assert_eq!(tv.session().buffered_count(), 1);
    }
}
