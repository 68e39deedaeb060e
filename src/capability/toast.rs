//! On-screen toast notifications.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};

use crate::command::{ResponseListener, raw_payload};

use super::{WebOsTv, reject};

const CREATE_TOAST: &str = "ssap://system.notifications/createToast";

// ============================================================================
// ToastControl
// ============================================================================

/// Toast notifications.
pub trait ToastControl {
    /// Shows a text toast. Empty messages are rejected.
    fn show_toast(&self, message: &str, listener: ResponseListener<Value>);

    /// Shows a toast with an icon.
    ///
    /// # Arguments
    ///
    /// * `message` - Toast text
    /// * `icon` - Raw image bytes, sent base64-encoded
    /// * `extension` - Image type, e.g. `"png"`
    /// * `listener` - Receives the TV's acknowledgement
    fn show_toast_with_icon(
        &self,
        message: &str,
        icon: &[u8],
        extension: &str,
        listener: ResponseListener<Value>,
    );
}

impl WebOsTv {
    fn create_toast(&self, payload: Value, listener: ResponseListener<Value>) {
        self.request(CREATE_TOAST, Some(payload), raw_payload(), listener);
    }
}

impl ToastControl for WebOsTv {
    fn show_toast(&self, message: &str, listener: ResponseListener<Value>) {
        if message.is_empty() {
            reject(&listener, "toast message must not be empty");
            return;
        }
        self.create_toast(json!({ "message": message }), listener);
    }

    fn show_toast_with_icon(
        &self,
        message: &str,
        icon: &[u8],
        extension: &str,
        listener: ResponseListener<Value>,
    ) {
        if message.is_empty() {
            reject(&listener, "toast message must not be empty");
            return;
        }
        self.create_toast(
            json!({
                "message": message,
                "iconData": STANDARD.encode(icon),
                "iconExtension": extension,
            }),
            listener,
        );
    }
}
