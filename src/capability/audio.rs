//! Volume and mute control.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::debug;

use crate::command::{ResponseListener, Subscription, raw_payload};
use crate::error::{Error, Result};

use super::{WebOsTv, field, reject};

// ============================================================================
// Endpoints
// ============================================================================

const VOLUME_UP: &str = "ssap://audio/volumeUp";
const VOLUME_DOWN: &str = "ssap://audio/volumeDown";
const SET_VOLUME: &str = "ssap://audio/setVolume";
const GET_VOLUME: &str = "ssap://audio/getVolume";
const SET_MUTE: &str = "ssap://audio/setMute";
const GET_MUTE: &str = "ssap://audio/getMute";

// ============================================================================
// VolumeControl
// ============================================================================

/// Volume and mute.
///
/// Volume levels are fractions in `0.0..=1.0`; the TV works in whole
/// percent.
pub trait VolumeControl {
    /// Raises the volume one step.
    fn volume_up(&self, listener: ResponseListener<Value>);

    /// Lowers the volume one step.
    fn volume_down(&self, listener: ResponseListener<Value>);

    /// Sets the volume. Values outside `0.0..=1.0` are rejected.
    fn set_volume(&self, volume: f32, listener: ResponseListener<Value>);

    /// Reads the current volume.
    fn get_volume(&self, listener: ResponseListener<f32>);

    /// Receives every volume change.
    fn subscribe_volume(&self, listener: ResponseListener<f32>) -> Arc<Subscription<f32>>;

    /// Mutes or unmutes.
    fn set_mute(&self, mute: bool, listener: ResponseListener<Value>);

    /// Reads the mute state.
    fn get_mute(&self, listener: ResponseListener<bool>);

    /// Receives every mute change.
    fn subscribe_mute(&self, listener: ResponseListener<bool>) -> Arc<Subscription<bool>>;
}

/// Reads `volume` (or `volumeStatus.volume` on newer firmware) as a fraction.
fn volume_fraction(payload: &Value) -> Result<f32> {
    payload
        .get("volume")
        .or_else(|| payload.get("volumeStatus").and_then(|s| s.get("volume")))
        .and_then(Value::as_i64)
        .map(|percent| percent as f32 / 100.0)
        .ok_or_else(|| Error::payload("missing field 'volume'"))
}

impl VolumeControl for WebOsTv {
    fn volume_up(&self, listener: ResponseListener<Value>) {
        self.request(VOLUME_UP, None, raw_payload(), listener);
    }

    fn volume_down(&self, listener: ResponseListener<Value>) {
        self.request(VOLUME_DOWN, None, raw_payload(), listener);
    }

    fn set_volume(&self, volume: f32, listener: ResponseListener<Value>) {
        if !(0.0..=1.0).contains(&volume) {
            reject(&listener, "volume must be between 0.0 and 1.0");
            return;
        }

        let percent = (volume * 100.0).round() as i64;
        debug!(percent, "Setting volume");
        self.request(
            SET_VOLUME,
            Some(json!({ "volume": percent })),
            raw_payload(),
            listener,
        );
    }

    fn get_volume(&self, listener: ResponseListener<f32>) {
        self.request(GET_VOLUME, None, Box::new(volume_fraction), listener);
    }

    fn subscribe_volume(&self, listener: ResponseListener<f32>) -> Arc<Subscription<f32>> {
        self.subscribe(GET_VOLUME, None, Box::new(volume_fraction), listener)
    }

    fn set_mute(&self, mute: bool, listener: ResponseListener<Value>) {
        self.request(SET_MUTE, Some(json!({ "mute": mute })), raw_payload(), listener);
    }

    fn get_mute(&self, listener: ResponseListener<bool>) {
        self.request(GET_MUTE, None, field("mute"), listener);
    }

    fn subscribe_mute(&self, listener: ResponseListener<bool>) -> Arc<Subscription<bool>> {
        self.subscribe(GET_MUTE, None, field("mute"), listener)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::testing::{answer, recorder, tv};

    #[tokio::test]
    async fn test_set_volume_rounds_to_percent() {
        let (tv, mut peer) = tv().await;
        let (listener, _results) = recorder();

        tv.set_volume(0.257, listener);

        let frame = peer.next_frame().await;
        assert_eq!(frame["uri"], SET_VOLUME);
        assert_eq!(frame["payload"], json!({"volume": 26}));
    }

    #[tokio::test]
    async fn test_set_volume_out_of_range_is_rejected() {
        let (tv, mut peer) = tv().await;

        for volume in [-0.1, 1.5, f32::NAN] {
            let (listener, mut results) = recorder();
            tv.set_volume(volume, listener);
            let result = results.recv().await.expect("listener called");
            assert!(matches!(result, Err(Error::InvalidArgument { .. })));
        }

        assert!(peer.try_frame().is_none());
        assert_eq!(tv.session().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_get_volume_converts_to_fraction() {
        let (tv, mut peer) = tv().await;
        let (listener, mut results) = recorder();

        tv.get_volume(listener);
        let frame = answer(&mut peer, json!({"volume": 40, "muted": false})).await;

        assert_eq!(frame["uri"], GET_VOLUME);
        assert_eq!(frame["type"], "request");
        let volume = results.recv().await.expect("listener called").expect("volume");
        assert!((volume - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn test_volume_status_payload() {
        let volume = volume_fraction(&json!({"volumeStatus": {"volume": 15}})).expect("volume");
        assert!((volume - 0.15).abs() < f32::EPSILON);
        assert!(volume_fraction(&json!({})).is_err());
    }

    #[tokio::test]
    async fn test_subscribe_mute_delivers_every_change() {
        let (tv, mut peer) = tv().await;
        let (listener, mut results) = recorder();

        let _subscription = tv.subscribe_mute(listener);
        let frame = answer(&mut peer, json!({"mute": true})).await;
        assert_eq!(frame["type"], "subscribe");
        assert_eq!(frame["uri"], GET_MUTE);

        peer.push(&json!({"type": "response", "id": frame["id"], "payload": {"mute": false}}).to_string());

        assert!(results.recv().await.expect("first").expect("mute"));
        assert!(!results.recv().await.expect("second").expect("mute"));
        assert_eq!(tv.session().pending_count(), 1);
    }

    #[tokio::test]
    async fn test_set_mute_payload() {
        let (tv, mut peer) = tv().await;
        let (listener, _results) = recorder();

        tv.set_mute(true, listener);

        let frame = peer.next_frame().await;
        assert_eq!(frame["uri"], SET_MUTE);
        assert_eq!(frame["payload"], json!({"mute": true}));
    }

    #[tokio::test]
    async fn test_volume_up_has_no_payload() {
        let (tv, mut peer) = tv().await;
        let (listener, _results) = recorder();

        tv.volume_up(listener);

        let frame = peer.next_frame().await;
        assert_eq!(frame["uri"], VOLUME_UP);
        assert!(frame.get("payload").is_none());
    }
}
