//! Device-facing API surface.
//!
//! [`WebOsTv`] wraps a [`Session`] and implements one trait per capability.
//! Every method builds a command and hands it to the session, which sends,
//! buffers, or reconnects as its state requires. Results arrive through the
//! listener; invalid arguments are reported there too and never sent.
//!
//! # Module Structure
//!
//! | Module | Trait(s) |
//! |--------|----------|
//! | `audio` | [`VolumeControl`] |
//! | `media` | [`PowerControl`], [`MediaControl`] |
//! | `tv` | [`TvControl`] |
//! | `toast` | [`ToastControl`] |
//! | `launcher` | [`Launcher`] |
//! | `webapp` | [`WebAppMessaging`], [`WebAppListener`] |
//! | `keyboard` | [`TextInputControl`] |
//! | `mouse` | [`MouseControl`] |
//!
//! # Example
//!
//! ```ignore
//! use webos_remote::command::listener;
//! use webos_remote::{VolumeControl, WebOsTv};
//!
//! let tv = WebOsTv::new(session);
//! tv.set_volume(0.25, listener(|r| println!("{r:?}")));
//! let sub = tv.subscribe_mute(listener(|muted| println!("mute: {muted:?}")));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::{Arc, Weak};

use serde_json::Value;

use crate::command::{Command, Converter, ResponseListener, Subscription};
use crate::error::Error;
use crate::session::Session;

// ============================================================================
// Submodules
// ============================================================================

mod audio;
mod keyboard;
mod launcher;
mod media;
mod mouse;
mod toast;
mod tv;
mod webapp;

// ============================================================================
// Re-exports
// ============================================================================

pub use audio::VolumeControl;
pub use keyboard::{KeyInput, KeyboardInput, TextInputControl};
pub use launcher::Launcher;
pub use media::{MediaControl, PowerControl};
pub use mouse::MouseControl;
pub use toast::ToastControl;
pub use tv::TvControl;
pub use webapp::{WebAppListener, WebAppMessaging};

pub(crate) use webapp::WebAppRouter;

// ============================================================================
// WebOsTv
// ============================================================================

/// Capability handle for one TV.
///
/// Cloning is cheap; clones share the session, the text input queue and the
/// web app message router.
#[derive(Clone)]
pub struct WebOsTv {
    session: Session,
    keyboard: Arc<KeyboardInput>,
    web_apps: Arc<WebAppRouter>,
}

impl std::fmt::Debug for WebOsTv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebOsTv")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl WebOsTv {
    /// Creates the handle.
    ///
    /// Installs itself as the session's [`P2pHandler`](crate::session::P2pHandler),
    /// replacing the handler of any earlier handle on the same session.
    #[must_use]
    pub fn new(session: Session) -> Self {
        let keyboard = KeyboardInput::new(session.clone());
        let web_apps = Arc::new(WebAppRouter::default());
        session.set_p2p_handler(web_apps.clone());
        Self {
            session,
            keyboard,
            web_apps,
        }
    }

    /// Returns the underlying session.
    #[inline]
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Returns the text input queue.
    #[inline]
    #[must_use]
    pub fn keyboard(&self) -> &KeyboardInput {
        &self.keyboard
    }

    pub(crate) fn keyboard_weak(&self) -> Weak<KeyboardInput> {
        Arc::downgrade(&self.keyboard)
    }

    pub(crate) fn web_apps(&self) -> &WebAppRouter {
        &self.web_apps
    }

    pub(crate) fn web_apps_weak(&self) -> Weak<WebAppRouter> {
        Arc::downgrade(&self.web_apps)
    }
}

// ============================================================================
// Command Helpers
// ============================================================================

impl WebOsTv {
    /// Sends a one-shot request.
    pub(crate) fn request<X: 'static>(
        &self,
        uri: &str,
        payload: Option<Value>,
        converter: Converter<X>,
        listener: ResponseListener<X>,
    ) {
        self.session
            .send_command(Arc::new(Command::new(uri, payload, converter, listener)));
    }

    /// Starts a subscription and returns it for later cancellation.
    pub(crate) fn subscribe<X: Clone + Send + Sync + 'static>(
        &self,
        uri: &str,
        payload: Option<Value>,
        converter: Converter<X>,
        listener: ResponseListener<X>,
    ) -> Arc<Subscription<X>> {
        let subscription = Arc::new(Subscription::new(uri, payload, converter, listener));
        self.session.send_command(subscription.clone());
        subscription
    }
}

/// Reports an argument error to `listener` without sending anything.
pub(crate) fn reject<X>(listener: &ResponseListener<X>, message: &str) {
    tracing::debug!(message, "Rejected invalid argument");
    listener(Err(Error::invalid_argument(message)));
}

/// Converter reading one typed field from the payload.
pub(crate) fn field<X>(key: &'static str) -> Converter<X>
where
    X: serde::de::DeserializeOwned + 'static,
{
    Box::new(move |payload| {
        let value = crate::protocol::required_field(payload, key)?;
        serde_json::from_value(value.clone())
            .map_err(|e| Error::payload(format!("field '{key}': {e}")))
    })
}

// ============================================================================
// Test Fixtures
// ============================================================================


// ============================================================================
// Tests
// ============================================================================
