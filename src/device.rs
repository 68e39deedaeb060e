//! Application-facing handle for one TV.
//!
//! A [`Device`] owns the session, the capability handle and the reconnect
//! supervisor, and wires them together:
//!
//! | Session state | Device reaction |
//! |---------------|-----------------|
//! | `Disconnected` | Reset keyboard queue, fail pending media commands, start supervisor (if started) |
//! | `Registered` | Stop supervisor |
//!
//! A rejected pairing stops the supervisor until [`Device::start`] is called
//! again, so the TV is not prompted over and over.
//!
//! Every notification is then forwarded to the application listener.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use webos_remote::command::listener;
//! use webos_remote::{Device, FileKeyStore, SessionConfig, VolumeControl};
//!
//! # async fn example() -> webos_remote::Result<()> {
//! let config = SessionConfig::for_host("192.168.1.20")?;
//! let keys = Arc::new(FileKeyStore::open("webos-key.json")?);
//! let device = Device::new(config, keys)?;
//! device.start();
//!
//! device.tv().volume_up(listener(|result| println!("{result:?}")));
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::capability::{KeyboardInput, WebAppRouter, WebOsTv};
use crate::config::SessionConfig;
use crate::error::Result;
use crate::keystore::KeyStore;
use crate::session::{Session, SessionListener, State};
use crate::supervisor::ReconnectSupervisor;

// ============================================================================
// Lifecycle Adapter
// ============================================================================

/// Session listener installed by the device.
///
/// Holds only weak references so the session does not keep its own
/// collaborators alive.
struct Lifecycle {
    started: AtomicBool,
    keyboard: Weak<KeyboardInput>,
    web_apps: Weak<WebAppRouter>,
    supervisor: Weak<ReconnectSupervisor>,
    application: RwLock<Option<Arc<dyn SessionListener>>>,
}

impl SessionListener for Lifecycle {
    fn on_state_changed(&self, old: State, new: State) {
        debug!(%old, %new, "TV state changed");
        match new {
            State::Disconnected => {
                if let Some(keyboard) = self.keyboard.upgrade() {
                    keyboard.reset();
                }
                if let Some(web_apps) = self.web_apps.upgrade() {
                    web_apps.reset();
                }
                if self.started.load(Ordering::SeqCst)
                    && let Some(supervisor) = self.supervisor.upgrade()
                {
                    supervisor.start();
                }
            }
            State::Registered => {
                info!("TV registered");
                if let Some(supervisor) = self.supervisor.upgrade() {
                    supervisor.stop();
                }
            }
            _ => {}
        }

        let application = self.application.read().clone();
        if let Some(application) = application {
            application.on_state_changed(old, new);
        }
    }

    fn on_error(&self, message: &str) {
        let application = self.application.read().clone();
        if let Some(application) = application {
            application.on_error(message);
        }
    }

    fn on_registration_failed(&self, message: &str) {
        warn!(error = message, "Pairing rejected; reconnection paused until restarted");
        self.started.store(false, Ordering::SeqCst);
        if let Some(supervisor) = self.supervisor.upgrade() {
            supervisor.stop();
        }

        let application = self.application.read().clone();
        if let Some(application) = application {
            application.on_registration_failed(message);
        }
    }
}

// ============================================================================
// Device
// ============================================================================

/// One TV: session, capabilities and reconnection.
pub struct Device {
    tv: WebOsTv,
    supervisor: Arc<ReconnectSupervisor>,
    lifecycle: Arc<Lifecycle>,
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("session", self.session())
            .field("supervisor", &self.supervisor)
            .finish_non_exhaustive()
    }
}

impl Device {
    /// Creates a device connecting over WebSocket.
    ///
    /// Nothing is opened until [`start`](Self::start) is called or a command
    /// is sent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tls`](crate::Error::Tls) or
    /// [`Error::Url`](crate::Error::Url) if the transport cannot be set up.
    pub fn new(config: SessionConfig, key_store: Arc<dyn KeyStore>) -> Result<Self> {
        Ok(Self::with_session(Session::new(config, key_store)?))
    }

    /// Creates a device around an existing session.
    ///
    /// Replaces the session's listener; install application listeners with
    /// [`set_listener`](Self::set_listener) instead.
    #[must_use]
    pub fn with_session(session: Session) -> Self {
        let tv = WebOsTv::new(session.clone());
        let supervisor = Arc::new(ReconnectSupervisor::new(session.clone()));
        let lifecycle = Arc::new(Lifecycle {
            started: AtomicBool::new(false),
            keyboard: tv.keyboard_weak(),
            web_apps: tv.web_apps_weak(),
            supervisor: Arc::downgrade(&supervisor),
            application: RwLock::new(None),
        });
        session.set_listener(lifecycle.clone());

        Self {
            tv,
            supervisor,
            lifecycle,
        }
    }

    /// Starts connecting and keeps the session connected.
    ///
    /// Also resumes reconnection after the TV rejected pairing.
    /// Must be called within a tokio runtime.
    pub fn start(&self) {
        self.lifecycle.started.store(true, Ordering::SeqCst);
        if self.session().state() == State::Registered {
            return;
        }
        self.supervisor.start();
    }

    /// Stops reconnecting and closes the session.
    pub fn shutdown(&self) {
        self.lifecycle.started.store(false, Ordering::SeqCst);
        self.supervisor.stop();
        self.session().disconnect();
    }

    /// Returns the capability handle.
    #[inline]
    #[must_use]
    pub fn tv(&self) -> &WebOsTv {
        &self.tv
    }

    /// Returns the session.
    #[inline]
    #[must_use]
    pub fn session(&self) -> &Session {
        self.tv.session()
    }

    /// Returns `true` while the reconnect supervisor is ticking.
    #[inline]
    #[must_use]
    pub fn is_reconnecting(&self) -> bool {
        self.supervisor.is_running()
    }

    /// Installs the application's lifecycle listener.
    pub fn set_listener(&self, listener: Arc<dyn SessionListener>) {
        *self.lifecycle.application.write() = Some(listener);
    }

    /// Removes the application's lifecycle listener.
    pub fn clear_listener(&self) {
        *self.lifecycle.application.write() = None;
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.supervisor.stop();
    }
}

// ============================================================================
// Tests
// ============================================================================
