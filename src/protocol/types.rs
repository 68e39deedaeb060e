//! Payload value types.
//!
//! Response payloads are parsed leniently: unknown fields are ignored and
//! optional fields default, so firmware differences do not break parsing.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

// ============================================================================
// ChannelInfo
// ============================================================================

/// A broadcast channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelInfo {
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_name: Option<String>,

    /// Device-internal channel id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,

    /// Channel number as shown to the user (e.g. `"7-1"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_number: Option<String>,

    /// Major number.
    pub major_number: i32,

    /// Minor number.
    pub minor_number: i32,
}

impl ChannelInfo {
    /// Creates a channel reference by id.
    #[must_use]
    pub fn with_id(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: Some(channel_id.into()),
            ..Self::default()
        }
    }

    /// Creates a channel reference by number.
    #[must_use]
    pub fn with_number(channel_number: impl Into<String>) -> Self {
        Self {
            channel_number: Some(channel_number.into()),
            ..Self::default()
        }
    }

    /// Builds the `openChannel` payload from whichever identifiers are set.
    #[must_use]
    pub fn open_payload(&self) -> Value {
        let mut payload = serde_json::Map::new();
        if let Some(id) = &self.channel_id {
            payload.insert("channelId".into(), Value::String(id.clone()));
        }
        if let Some(number) = &self.channel_number {
            payload.insert("channelNumber".into(), Value::String(number.clone()));
        }
        Value::Object(payload)
    }
}

// ============================================================================
// AppInfo
// ============================================================================

/// An installed or running application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppInfo {
    /// Application id (e.g. `youtube.leanback.v4`).
    #[serde(alias = "appId")]
    pub id: String,

    /// User-facing name.
    #[serde(alias = "title", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl AppInfo {
    /// Creates an app reference by id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }
}

// ============================================================================
// LaunchSession
// ============================================================================

/// Kind of a launched session, which selects how it is closed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LaunchSessionType {
    /// Native application.
    #[default]
    App,
    /// Input source picker.
    ExternalInputPicker,
    /// Media viewer.
    Media,
    /// Web application.
    WebApp,
    /// Unrecognized; cannot be closed.
    Unknown,
}

/// Handle to something launched on the TV.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchSession {
    /// Launched application id.
    pub app_id: String,
    /// Session id returned by the TV.
    pub session_id: Option<String>,
    /// Session kind.
    pub session_type: LaunchSessionType,
}

impl LaunchSession {
    /// Builds an app session from a `launch`/`open` response.
    ///
    /// The response's `id` wins over `fallback_app_id` when present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Payload`] if neither an app id nor a fallback is available.
    pub fn from_launch_response(payload: &Value, fallback_app_id: Option<&str>) -> Result<Self> {
        let app_id = payload
            .get("id")
            .and_then(Value::as_str)
            .or(fallback_app_id)
            .ok_or_else(|| Error::payload("launch response has no app id"))?;

        Ok(Self {
            app_id: app_id.to_string(),
            session_id: payload
                .get("sessionId")
                .and_then(Value::as_str)
                .map(str::to_string),
            session_type: LaunchSessionType::App,
        })
    }
}

// ============================================================================
// TextInputStatus
// ============================================================================

/// State of the TV's on-screen keyboard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextInputStatus {
    /// A text widget has focus.
    pub focused: bool,
    /// Widget content type (e.g. `"text"`, `"url"`).
    pub content_type: Option<String>,
    /// Word prediction enabled.
    pub prediction_enabled: bool,
    /// Auto-correction enabled.
    pub correction_enabled: bool,
    /// Auto-capitalization enabled.
    pub auto_capitalization: bool,
    /// Password-style widget.
    pub hidden_text: bool,
    /// Focus changed since the previous notification.
    pub focus_changed: bool,
    /// Unparsed notification.
    pub raw: Value,
}

impl TextInputStatus {
    /// Parses a `registerRemoteKeyboard` notification. Missing flags are `false`.
    #[must_use]
    pub fn from_payload(payload: &Value) -> Self {
        let flag = |obj: &Value, key: &str| obj.get(key).and_then(Value::as_bool).unwrap_or(false);

        let mut status = Self {
            focus_changed: flag(payload, "focusChanged"),
            raw: payload.clone(),
            ..Self::default()
        };

        if let Some(widget) = payload.get("currentWidget") {
            status.focused = flag(widget, "focus");
            status.content_type = widget
                .get("contentType")
                .and_then(Value::as_str)
                .map(str::to_string);
            status.prediction_enabled = flag(widget, "predictionEnabled");
            status.correction_enabled = flag(widget, "correctionEnabled");
            status.auto_capitalization = flag(widget, "autoCapitalization");
            status.hidden_text = flag(widget, "hiddenText");
        }

        status
    }
}

// ============================================================================
// PlayState
// ============================================================================

/// Playback state reported by a web app's media player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlayState {
    /// Unrecognized state string.
    #[default]
    Unknown,
    /// Nothing loaded.
    Idle,
    /// Playing.
    Playing,
    /// Paused.
    Paused,
    /// Waiting for data.
    Buffering,
    /// Reached the end.
    Finished,
}

impl PlayState {
    /// Parses the player's `playState` string.
    #[must_use]
    pub fn parse(state: &str) -> Self {
        match state {
            "idle" => Self::Idle,
            "playing" => Self::Playing,
            "paused" => Self::Paused,
            "buffering" => Self::Buffering,
            "finished" => Self::Finished,
            _ => Self::Unknown,
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Returns `payload[key]`.
///
/// # Errors
///
/// Returns [`Error::Payload`] if the field is missing.
pub fn required_field<'a>(payload: &'a Value, key: &str) -> Result<&'a Value> {
    payload
        .get(key)
        .ok_or_else(|| Error::payload(format!("missing field '{key}'")))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_play_state_parse() {
        assert_eq!(PlayState::parse("playing"), PlayState::Playing);
        assert_eq!(PlayState::parse("finished"), PlayState::Finished);
        assert_eq!(PlayState::parse("PLAYING"), PlayState::Unknown);
        assert_eq!(PlayState::parse(""), PlayState::Unknown);
    }

    #[test]
    fn test_channel_info_deserialize() {
        let channel: ChannelInfo = serde_json::from_value(json!({
            "channelName": "BBC One",
            "channelId": "1_21_7_0_0_1_0",
            "channelNumber": "7",
            "majorNumber": 7,
            "minorNumber": 0,
            "isRadio": false
        }))
        .expect("channel");

        assert_eq!(channel.channel_name.as_deref(), Some("BBC One"));
        assert_eq!(channel.channel_number.as_deref(), Some("7"));
        assert_eq!(channel.major_number, 7);
    }

    #[test]
    fn test_channel_open_payload() {
        assert_eq!(
            ChannelInfo::with_id("abc").open_payload(),
            json!({"channelId": "abc"})
        );
        assert_eq!(
            ChannelInfo::with_number("5-1").open_payload(),
            json!({"channelNumber": "5-1"})
        );
    }

    #[test]
    fn test_app_info_aliases() {
        let listed: AppInfo =
            serde_json::from_value(json!({"id": "netflix", "title": "Netflix"})).expect("app");
        assert_eq!(listed.id, "netflix");
        assert_eq!(listed.name.as_deref(), Some("Netflix"));

        let foreground: AppInfo =
            serde_json::from_value(json!({"appId": "com.webos.app.hdmi1", "windowId": ""}))
                .expect("app");
        assert_eq!(foreground.id, "com.webos.app.hdmi1");
        assert!(foreground.name.is_none());
    }

    #[test]
    fn test_launch_session_from_response() {
        let session =
            LaunchSession::from_launch_response(&json!({"sessionId": "s1"}), Some("netflix"))
                .expect("session");
        assert_eq!(session.app_id, "netflix");
        assert_eq!(session.session_id.as_deref(), Some("s1"));
        assert_eq!(session.session_type, LaunchSessionType::App);

        let browser = LaunchSession::from_launch_response(
            &json!({"id": "com.webos.app.browser", "sessionId": "s2"}),
            None,
        )
        .expect("session");
        assert_eq!(browser.app_id, "com.webos.app.browser");
    }

    #[test]
    fn test_launch_session_without_id_fails() {
        let result = LaunchSession::from_launch_response(&json!({}), None);
        assert!(matches!(result, Err(Error::Payload { .. })));
    }

    #[test]
    fn test_text_input_status_parsing() {
        let raw = json!({
            "focusChanged": true,
            "currentWidget": {
                "focus": true,
                "contentType": "url",
                "hiddenText": true
            }
        });
        let status = TextInputStatus::from_payload(&raw);

        assert!(status.focused);
        assert!(status.focus_changed);
        assert!(status.hidden_text);
        assert!(!status.prediction_enabled);
        assert_eq!(status.content_type.as_deref(), Some("url"));
        assert_eq!(status.raw, raw);
    }

    #[test]
    fn test_text_input_status_without_widget() {
        let status = TextInputStatus::from_payload(&json!({}));
        assert!(!status.focused);
        assert!(status.content_type.is_none());
    }

    #[test]
    fn test_required_field() {
        let payload = json!({"volume": 12});
        assert_eq!(required_field(&payload, "volume").expect("field"), &json!(12));
        assert!(matches!(
            required_field(&payload, "mute"),
            Err(Error::Payload { .. })
        ));
    }
}
