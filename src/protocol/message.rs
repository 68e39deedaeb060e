//! Inbound and outbound frame codec.
//!
//! Every frame is a single JSON text message. Outbound frames carry an
//! integer `id` chosen by the session; inbound frames echo it back.

// ============================================================================
// Imports
// ============================================================================

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

// ============================================================================
// Types
// ============================================================================

/// Request id used for response correlation.
pub type RequestId = u32;

/// Permissions requested in the pairing manifest.
pub const PERMISSIONS: &[&str] = &[
    "LAUNCH",
    "LAUNCH_WEBAPP",
    "APP_TO_APP",
    "CONTROL_AUDIO",
    "CONTROL_INPUT_MEDIA_PLAYBACK",
    "CONTROL_POWER",
    "READ_INSTALLED_APPS",
    "CONTROL_DISPLAY",
    "CONTROL_INPUT_JOYSTICK",
    "CONTROL_INPUT_MEDIA_RECORDING",
    "CONTROL_INPUT_TV",
    "READ_INPUT_DEVICE_LIST",
    "READ_NETWORK_STATE",
    "READ_TV_CHANNEL_LIST",
    "WRITE_NOTIFICATION_TOAST",
    "CONTROL_INPUT_TEXT",
    "CONTROL_MOUSE_AND_KEYBOARD",
    "READ_CURRENT_CHANNEL",
    "READ_RUNNING_APPS",
];

// ============================================================================
// RequestKind
// ============================================================================

/// Whether a command is answered once or keeps delivering results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// One-shot `request`.
    Request,
    /// Persistent `subscribe`.
    Subscribe,
}

// ============================================================================
// Handshake Payloads
// ============================================================================

/// Payload of the `hello` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelloPayload {
    /// Application id.
    pub app_id: String,
    /// Application name.
    pub app_name: String,
    /// Application region.
    pub app_region: String,
}

/// How the TV should confirm pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PairingType {
    /// On-screen accept/deny prompt.
    Prompt,
    /// PIN shown on screen.
    Pin,
    /// Prompt or PIN, TV decides.
    Combined,
}

/// Permission manifest sent with `register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Always 1.
    pub manifest_version: u32,
    /// Requested permissions.
    pub permissions: &'static [&'static str],
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            manifest_version: 1,
            permissions: PERMISSIONS,
        }
    }
}

/// Payload of the `register` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPayload {
    /// Key from a previous pairing, if any.
    #[serde(rename = "client-key", skip_serializing_if = "Option::is_none")]
    pub client_key: Option<String>,
    /// Pairing confirmation mode.
    pub pairing_type: PairingType,
    /// Permission manifest.
    pub manifest: Manifest,
}

impl RegisterPayload {
    /// Creates a `PROMPT` registration, reusing `client_key` when non-empty.
    #[must_use]
    pub fn prompt(client_key: Option<String>) -> Self {
        Self {
            client_key: client_key.filter(|key| !key.is_empty()),
            pairing_type: PairingType::Prompt,
            manifest: Manifest::default(),
        }
    }
}

// ============================================================================
// OutboundFrame
// ============================================================================

/// A frame sent from the local end to the TV.
///
/// # Format
///
/// ```json
/// {
///   "type": "request",
///   "id": 7,
///   "uri": "ssap://audio/setVolume",
///   "payload": { "volume": 20 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundFrame {
    /// Opens the handshake.
    Hello {
        /// Request id.
        id: RequestId,
        /// Client identification.
        payload: HelloPayload,
    },

    /// Pairing request.
    Register {
        /// Request id.
        id: RequestId,
        /// Key and manifest.
        payload: RegisterPayload,
    },

    /// One-shot command.
    Request {
        /// Request id.
        id: RequestId,
        /// Target endpoint.
        uri: String,
        /// Command arguments.
        #[serde(skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },

    /// Persistent subscription.
    Subscribe {
        /// Request id.
        id: RequestId,
        /// Target endpoint.
        uri: String,
        /// Subscription arguments.
        #[serde(skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },

    /// Cancels the subscription registered under `id`.
    Unsubscribe {
        /// Subscription request id.
        id: RequestId,
    },
}

impl OutboundFrame {
    /// Creates a `request` or `subscribe` frame.
    #[must_use]
    pub fn command(
        kind: RequestKind,
        id: RequestId,
        uri: impl Into<String>,
        payload: Option<Value>,
    ) -> Self {
        let uri = uri.into();
        match kind {
            RequestKind::Request => Self::Request { id, uri, payload },
            RequestKind::Subscribe => Self::Subscribe { id, uri, payload },
        }
    }

    /// Returns the frame's request id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> RequestId {
        match self {
            Self::Hello { id, .. }
            | Self::Register { id, .. }
            | Self::Request { id, .. }
            | Self::Subscribe { id, .. }
            | Self::Unsubscribe { id } => *id,
        }
    }

    /// Serializes the frame to JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if serialization fails.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Serializes a `p2p` payload verbatim.
///
/// # Errors
///
/// Returns [`Error::Json`](crate::Error::Json) if serialization fails.
pub fn encode_p2p(payload: &Value) -> Result<String> {
    Ok(serde_json::to_string(payload)?)
}

/// Returns `true` if the payload declares `"type": "p2p"`.
#[inline]
#[must_use]
pub fn is_p2p(payload: Option<&Value>) -> bool {
    payload
        .and_then(|p| p.get("type"))
        .and_then(Value::as_str)
        .is_some_and(|t| t == "p2p")
}

// ============================================================================
// InboundFrame
// ============================================================================

/// Inbound frame type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameType {
    /// Handshake greeting.
    Hello,
    /// Pairing accepted.
    Registered,
    /// Successful result.
    Response,
    /// Failure.
    Error,
    /// Message from a web app running on the TV.
    P2p,
    /// Anything else.
    #[serde(other)]
    Unknown,
}

/// A frame received from the TV.
///
/// # Format
///
/// ```json
/// { "type": "response", "id": 7, "payload": { "returnValue": true } }
/// { "type": "error", "id": 8, "error": "404 no such service or method" }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct InboundFrame {
    /// Echoed request id (number or numeric string).
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<RequestId>,

    /// Frame type.
    #[serde(rename = "type")]
    pub frame_type: FrameType,

    /// Result data.
    #[serde(default)]
    pub payload: Option<Value>,

    /// Error string (for `error` frames).
    #[serde(default)]
    pub error: Option<String>,

    /// Sending web app id (for `p2p` frames).
    #[serde(default)]
    pub from: Option<String>,
}

impl InboundFrame {
    /// Parses a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) on malformed JSON or a
    /// missing `type`.
    pub fn decode(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Returns the error string, or a generic one if absent.
    #[inline]
    #[must_use]
    pub fn error_message(&self) -> &str {
        self.error.as_deref().unwrap_or("unknown error")
    }

    /// Gets a string value from the payload.
    #[inline]
    #[must_use]
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload
            .as_ref()
            .and_then(|p| p.get(key))
            .and_then(Value::as_str)
    }
}

/// Accepts `7`, `"7"`, `null` or a missing id; other shapes become `None`.
fn lenient_id<'de, D>(deserializer: D) -> std::result::Result<Option<RequestId>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| RequestId::try_from(n).ok()),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialization() {
        let frame = OutboundFrame::command(
            RequestKind::Request,
            3,
            "ssap://audio/setVolume",
            Some(json!({"volume": 50})),
        );
        let value: Value = serde_json::from_str(&frame.encode().expect("encode")).expect("json");

        assert_eq!(
            value,
            json!({"type": "request", "id": 3, "uri": "ssap://audio/setVolume", "payload": {"volume": 50}})
        );
    }

    #[test]
    fn test_subscribe_without_payload_omits_field() {
        let frame = OutboundFrame::command(RequestKind::Subscribe, 4, "ssap://audio/getMute", None);
        let value: Value = serde_json::from_str(&frame.encode().expect("encode")).expect("json");

        assert_eq!(value["type"], "subscribe");
        assert!(value.get("payload").is_none());
        assert_eq!(frame.id(), 4);
    }

    #[test]
    fn test_unsubscribe_serialization() {
        let frame = OutboundFrame::Unsubscribe { id: 9 };
        let value: Value = serde_json::from_str(&frame.encode().expect("encode")).expect("json");
        assert_eq!(value, json!({"type": "unsubscribe", "id": 9}));
    }

    #[test]
    fn test_hello_serialization() {
        let frame = OutboundFrame::Hello {
            id: 0,
            payload: HelloPayload {
                app_id: "org.webosremote".into(),
                app_name: "webos-remote".into(),
                app_region: "United States".into(),
            },
        };
        let value: Value = serde_json::from_str(&frame.encode().expect("encode")).expect("json");

        assert_eq!(value["type"], "hello");
        assert_eq!(value["payload"]["appId"], "org.webosremote");
        assert_eq!(value["payload"]["appName"], "webos-remote");
        assert_eq!(value["payload"]["appRegion"], "United States");
    }

    #[test]
    fn test_register_with_key() {
        let frame = OutboundFrame::Register {
            id: 1,
            payload: RegisterPayload::prompt(Some("abc".into())),
        };
        let value: Value = serde_json::from_str(&frame.encode().expect("encode")).expect("json");

        assert_eq!(value["payload"]["client-key"], "abc");
        assert_eq!(value["payload"]["pairingType"], "PROMPT");
        assert_eq!(value["payload"]["manifest"]["manifestVersion"], 1);
        assert_eq!(
            value["payload"]["manifest"]["permissions"]
                .as_array()
                .map(Vec::len),
            Some(PERMISSIONS.len())
        );
    }

    #[test]
    fn test_register_skips_empty_key() {
        let payload = RegisterPayload::prompt(Some(String::new()));
        let value = serde_json::to_value(&payload).expect("json");
        assert!(value.get("client-key").is_none());
    }

    #[test]
    fn test_is_p2p() {
        assert!(is_p2p(Some(&json!({"type": "p2p", "to": "app", "payload": {}}))));
        assert!(!is_p2p(Some(&json!({"volume": 3}))));
        assert!(!is_p2p(Some(&json!({"type": 1}))));
        assert!(!is_p2p(None));
    }

    #[test]
    fn test_decode_response() {
        let frame = InboundFrame::decode(r#"{"type":"response","id":5,"payload":{"mute":true}}"#)
            .expect("parse");
        assert_eq!(frame.frame_type, FrameType::Response);
        assert_eq!(frame.id, Some(5));
        assert_eq!(frame.payload, Some(json!({"mute": true})));
    }

    #[test]
    fn test_decode_string_id() {
        let frame = InboundFrame::decode(r#"{"type":"response","id":"12"}"#).expect("parse");
        assert_eq!(frame.id, Some(12));
        assert!(frame.payload.is_none());
    }

    #[test]
    fn test_decode_non_numeric_id_is_absent() {
        let frame = InboundFrame::decode(r#"{"type":"response","id":"register_0"}"#).expect("parse");
        assert_eq!(frame.id, None);
    }

    #[test]
    fn test_decode_error_frame() {
        let frame = InboundFrame::decode(
            r#"{"type":"error","id":2,"error":"404 no such service or method","payload":{}}"#,
        )
        .expect("parse");
        assert_eq!(frame.frame_type, FrameType::Error);
        assert_eq!(frame.error_message(), "404 no such service or method");
    }

    #[test]
    fn test_decode_registered() {
        let frame =
            InboundFrame::decode(r#"{"type":"registered","id":1,"payload":{"client-key":"abc"}}"#)
                .expect("parse");
        assert_eq!(frame.frame_type, FrameType::Registered);
        assert_eq!(frame.payload_str("client-key"), Some("abc"));
    }

    #[test]
    fn test_decode_unknown_type() {
        let frame = InboundFrame::decode(r#"{"type":"ping"}"#).expect("parse");
        assert_eq!(frame.frame_type, FrameType::Unknown);
    }

    #[test]
    fn test_decode_p2p_from_web_app() {
        let frame = InboundFrame::decode(
            r#"{"type":"p2p","from":"com.example.player","payload":"ready"}"#,
        )
        .expect("parse");
        assert_eq!(frame.frame_type, FrameType::P2p);
        assert_eq!(frame.from.as_deref(), Some("com.example.player"));
        assert_eq!(frame.payload, Some(json!("ready")));
        assert_eq!(frame.id, None);
    }

    #[test]
    fn test_decode_malformed_json_fails() {
        assert!(InboundFrame::decode("{not json").is_err());
        assert!(InboundFrame::decode(r#"{"id":1}"#).is_err());
    }
}
