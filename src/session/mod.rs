//! Device communication session.
//!
//! A [`Session`] owns the single WebSocket link to one TV. It drives the
//! pairing handshake, correlates responses with pending commands, and
//! buffers commands issued while the link is not registered.
//!
//! # State Machine
//!
//! | From | Event | To |
//! |------|-------|----|
//! | Disconnected | [`Session::connect`] | Connecting |
//! | Connecting | socket open | Connecting (sends `hello`) |
//! | any | `hello` received | Registering (sends `register`) |
//! | Registering | `registered` received | Registered (drains buffer) |
//! | Registering | `error` for the register id | Disconnected |
//! | any | socket closed / [`Session::disconnect`] | Disconnected |
//!
//! # Command Routing
//!
//! | State | [`Session::send_command`] |
//! |-------|---------------------------|
//! | Registered | Sent immediately (`p2p` payloads verbatim, without id) |
//! | Connecting, Registering | Appended to the offline buffer |
//! | Disconnected, Disconnecting | Appended to the offline buffer, then `connect()` |
//!
//! Pending requests have no timeout; they live until answered or until the
//! socket closes. Inbound `p2p` frames carry no id and go straight to the
//! [`P2pHandler`].

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use url::Url;

use crate::command::ServiceCommand;
use crate::config::SessionConfig;
use crate::error::Result;
use crate::keystore::KeyStore;
use crate::protocol::{
    FrameType, HelloPayload, InboundFrame, OutboundFrame, RegisterPayload, RequestId, encode_p2p,
    is_p2p,
};
use crate::transport::{Connector, LinkEvent, WsConnector};

// ============================================================================
// Submodules
// ============================================================================

/// Pending request table.
pub mod requests;

#[cfg(test)]
pub(crate) mod testing;

pub use requests::{RequestTable, SharedCommand};

// ============================================================================
// State
// ============================================================================

/// Connection state of a [`Session`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum State {
    /// No link.
    #[default]
    Disconnected,
    /// Opening the socket.
    Connecting,
    /// `register` sent, waiting for the TV to accept.
    Registering,
    /// Paired; commands are sent immediately.
    Registered,
    /// Closing the socket.
    Disconnecting,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "DISCONNECTED",
            Self::Connecting => "CONNECTING",
            Self::Registering => "REGISTERING",
            Self::Registered => "REGISTERED",
            Self::Disconnecting => "DISCONNECTING",
        };
        f.write_str(name)
    }
}

// ============================================================================
// SessionListener
// ============================================================================

/// Receives session lifecycle notifications.
///
/// Callbacks run on the session's I/O task or on the caller's thread and are
/// never invoked while the session lock is held, so they may call back into
/// the session.
pub trait SessionListener: Send + Sync {
    /// Called on every state transition.
    fn on_state_changed(&self, old: State, new: State);

    /// Called with a transport error.
    fn on_error(&self, message: &str);

    /// Called when the TV answers `register` with an error.
    ///
    /// The session disconnects right after this callback and does not retry
    /// the handshake. Defaults to [`on_error`](Self::on_error).
    fn on_registration_failed(&self, message: &str) {
        self.on_error(message);
    }
}

/// Receives `p2p` frames sent by web apps running on the TV.
///
/// Called on the session's I/O task without the session lock held.
pub trait P2pHandler: Send + Sync {
    /// Called with the sending app id and the frame's payload.
    fn on_p2p_message(&self, from: &str, payload: &Value);
}

/// Notification collected under the lock and delivered after it is released.
enum Notice {
    State(State, State),
    Error(String),
    RegistrationFailed(String),
}

// ============================================================================
// Shared State
// ============================================================================

/// Mutable session state, guarded by one mutex.
#[derive(Default)]
struct Shared {
    state: State,
    next_request_id: RequestId,
    requests: RequestTable,
    offline: VecDeque<SharedCommand>,
    link: Option<mpsc::UnboundedSender<String>>,
    register_id: Option<RequestId>,
    /// Incremented per link; events from older links are ignored.
    generation: u64,
}

impl Shared {
    fn set_state(&mut self, new: State, notices: &mut Vec<Notice>) {
        let old = self.state;
        if old != new {
            self.state = new;
            notices.push(Notice::State(old, new));
        }
    }

    fn next_request_id(&mut self) -> RequestId {
        self.requests.next_id(&mut self.next_request_id)
    }

    fn transmit(&self, text: String) {
        match &self.link {
            Some(link) => {
                if link.send(text).is_err() {
                    warn!("Link closed, frame dropped");
                }
            }
            None => warn!(frame = %text, "No connection to TV, skipping frame"),
        }
    }

    fn send_frame(&self, frame: &OutboundFrame) {
        match frame.encode() {
            Ok(text) => self.transmit(text),
            Err(e) => warn!(error = %e, "Failed to encode frame"),
        }
    }

    /// Sends `command` on the registered link.
    fn dispatch(&mut self, command: SharedCommand) {
        if let Some(payload) = command.payload().filter(|p| is_p2p(Some(*p))) {
            match encode_p2p(payload) {
                Ok(text) => self.transmit(text),
                Err(e) => warn!(error = %e, "Failed to encode p2p payload"),
            }
            return;
        }

        let id = self.next_request_id();
        let frame = OutboundFrame::command(
            command.kind(),
            id,
            command.target(),
            command.payload().cloned(),
        );

        if let Err(e) = self.requests.register(id, command) {
            warn!(error = %e, "Failed to register request");
            return;
        }

        self.send_frame(&frame);
    }
}

/// Outcome of an inbound `error` frame.
enum ErrorRoute {
    Command(SharedCommand),
    Registration,
    Unmatched,
}

// ============================================================================
// Session
// ============================================================================

struct Inner {
    config: SessionConfig,
    url: Url,
    connector: Arc<dyn Connector>,
    key_store: Arc<dyn KeyStore>,
    shared: Mutex<Shared>,
    listener: RwLock<Option<Arc<dyn SessionListener>>>,
    p2p_handler: RwLock<Option<Arc<dyn P2pHandler>>>,
}

/// Persistent, self-healing link to one TV.
///
/// `Session` is a cheap handle; clones share the same connection.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use webos_remote::{MemoryKeyStore, Session, SessionConfig};
///
/// # async fn example() -> webos_remote::Result<()> {
/// let config = SessionConfig::for_host("192.168.1.20")?;
/// let session = Session::new(config, Arc::new(MemoryKeyStore::new()))?;
/// session.connect();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("url", &self.inner.url.as_str())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl Session {
    /// Creates a session using the WebSocket connector.
    ///
    /// # Errors
    ///
    /// - [`Error::Url`](crate::Error::Url) if the configured host is invalid
    /// - [`Error::Tls`](crate::Error::Tls) if TLS cannot be configured
    pub fn new(config: SessionConfig, key_store: Arc<dyn KeyStore>) -> Result<Self> {
        let connector = Arc::new(WsConnector::new(config.accept_invalid_certs)?);
        Self::with_connector(config, key_store, connector)
    }

    /// Creates a session with a custom connector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Url`](crate::Error::Url) if the configured host is invalid.
    pub fn with_connector(
        config: SessionConfig,
        key_store: Arc<dyn KeyStore>,
        connector: Arc<dyn Connector>,
    ) -> Result<Self> {
        let url = config.url()?;
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                url,
                connector,
                key_store,
                shared: Mutex::new(Shared::default()),
                listener: RwLock::new(None),
                p2p_handler: RwLock::new(None),
            }),
        })
    }

    fn from_weak(inner: &Weak<Inner>) -> Option<Self> {
        inner.upgrade().map(|inner| Self { inner })
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl Session {
    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> State {
        self.inner.shared.lock().state
    }

    /// Returns `true` once paired (`Registered`).
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == State::Registered
    }

    /// Returns the destination URI.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.inner.url
    }

    /// Returns the session configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Returns the number of in-flight requests and subscriptions.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.shared.lock().requests.len()
    }

    /// Returns the number of commands waiting for registration.
    #[inline]
    #[must_use]
    pub fn buffered_count(&self) -> usize {
        self.inner.shared.lock().offline.len()
    }

    pub(crate) fn connector(&self) -> Arc<dyn Connector> {
        Arc::clone(&self.inner.connector)
    }

    /// Sets the lifecycle listener.
    pub fn set_listener(&self, listener: Arc<dyn SessionListener>) {
        *self.inner.listener.write() = Some(listener);
    }

    /// Removes the lifecycle listener.
    pub fn clear_listener(&self) {
        *self.inner.listener.write() = None;
    }

    /// Sets the receiver of inbound web app messages, replacing any previous one.
    pub fn set_p2p_handler(&self, handler: Arc<dyn P2pHandler>) {
        *self.inner.p2p_handler.write() = Some(handler);
    }

    fn emit(&self, notices: Vec<Notice>) {
        if notices.is_empty() {
            return;
        }
        let Some(listener) = self.inner.listener.read().clone() else {
            return;
        };
        for notice in notices {
            match notice {
                Notice::State(old, new) => listener.on_state_changed(old, new),
                Notice::Error(message) => listener.on_error(&message),
                Notice::RegistrationFailed(message) => listener.on_registration_failed(&message),
            }
        }
    }
}

// ============================================================================
// Connection Control
// ============================================================================

impl Session {
    /// Opens the link if currently `Disconnected`; otherwise does nothing.
    ///
    /// The socket is opened on a spawned task, so this must be called from
    /// within a tokio runtime.
    pub fn connect(&self) {
        let Ok(runtime) = Handle::try_current() else {
            warn!("connect() called outside a tokio runtime");
            self.emit(vec![Notice::Error("no tokio runtime available".to_string())]);
            return;
        };

        let mut notices = Vec::new();
        let generation = {
            let mut shared = self.inner.shared.lock();
            if shared.state != State::Disconnected {
                debug!(state = %shared.state, "Already connecting; not trying to connect again");
                return;
            }
            shared.set_state(State::Connecting, &mut notices);
            shared.generation += 1;
            shared.generation
        };
        self.emit(notices);

        debug!(url = %self.inner.url, "Connecting");
        runtime.spawn(run_link(
            Arc::downgrade(&self.inner),
            Arc::clone(&self.inner.connector),
            self.inner.url.clone(),
            generation,
        ));
    }

    /// Closes the link and clears pending requests.
    ///
    /// Commands still in the offline buffer are kept and sent after the next
    /// successful registration.
    pub fn disconnect(&self) {
        let mut notices = Vec::new();
        {
            let mut shared = self.inner.shared.lock();
            if shared.state == State::Disconnected {
                debug!("Already disconnected");
                return;
            }
            shared.generation += 1;
            shared.set_state(State::Disconnecting, &mut notices);
            shared.link = None;
            shared.requests.clear();
            shared.register_id = None;
            shared.set_state(State::Disconnected, &mut notices);
        }
        debug!(url = %self.inner.url, "Disconnected");
        self.emit(notices);
    }
}

// ============================================================================
// Commands
// ============================================================================

impl Session {
    /// Sends a command, or buffers it until the session is registered.
    pub fn send_command(&self, command: SharedCommand) {
        let needs_connect = {
            let mut shared = self.inner.shared.lock();
            match shared.state {
                State::Registered => {
                    shared.dispatch(command);
                    false
                }
                State::Connecting | State::Registering => {
                    debug!(target_uri = command.target(), "Queuing command");
                    shared.offline.push_back(command);
                    false
                }
                State::Disconnected | State::Disconnecting => {
                    debug!(
                        target_uri = command.target(),
                        "Queuing command and (re-)starting socket"
                    );
                    shared.offline.push_back(command);
                    true
                }
            }
        };

        if needs_connect {
            self.connect();
        }
    }

    /// Cancels a subscription. Does nothing if it is not registered.
    pub fn unsubscribe<C: ServiceCommand + ?Sized>(&self, subscription: &Arc<C>) {
        let mut shared = self.inner.shared.lock();

        let target = Arc::as_ptr(subscription);
        shared
            .offline
            .retain(|queued| !std::ptr::addr_eq(Arc::as_ptr(queued), target));

        let Some(id) = shared.requests.find(subscription) else {
            debug!(target_uri = subscription.target(), "Subscription not registered");
            return;
        };
        shared.requests.remove(id);
        shared.send_frame(&OutboundFrame::Unsubscribe { id });
    }
}

// ============================================================================
// Link Events
// ============================================================================

/// Opens the link and feeds its events to the session.
async fn run_link(inner: Weak<Inner>, connector: Arc<dyn Connector>, url: Url, generation: u64) {
    let result = connector.connect(&url).await;

    let mut incoming = {
        let Some(session) = Session::from_weak(&inner) else {
            return;
        };
        match result {
            Ok(link) => {
                if !session.on_open(generation, link.outgoing) {
                    return;
                }
                link.incoming
            }
            Err(e) => {
                session.on_connect_failed(generation, &e.to_string());
                return;
            }
        }
    };

    while let Some(event) = incoming.recv().await {
        let Some(session) = Session::from_weak(&inner) else {
            break;
        };
        if !session.handle_link_event(generation, event) {
            break;
        }
    }
}

impl Session {
    fn is_current(&self, generation: u64) -> bool {
        self.inner.shared.lock().generation == generation
    }

    fn on_open(&self, generation: u64, outgoing: mpsc::UnboundedSender<String>) -> bool {
        let mut shared = self.inner.shared.lock();
        if shared.generation != generation {
            debug!("Discarding link opened after disconnect");
            return false;
        }

        debug!(url = %self.inner.url, "WebSocket connected");
        shared.link = Some(outgoing);

        let config = &self.inner.config;
        let id = shared.next_request_id();
        // The hello response carries no id, so it is not tracked.
        shared.send_frame(&OutboundFrame::Hello {
            id,
            payload: HelloPayload {
                app_id: config.app_id.clone(),
                app_name: config.app_name.clone(),
                app_region: config.app_region.clone(),
            },
        });
        true
    }

    fn on_connect_failed(&self, generation: u64, message: &str) {
        warn!(url = %self.inner.url, error = message, "Unable to connect");

        let mut notices = vec![Notice::Error(message.to_string())];
        {
            let mut shared = self.inner.shared.lock();
            if shared.generation != generation {
                return;
            }
            shared.set_state(State::Disconnected, &mut notices);
        }
        self.emit(notices);
    }

    /// Returns `false` once the link should no longer be read.
    fn handle_link_event(&self, generation: u64, event: LinkEvent) -> bool {
        if !self.is_current(generation) {
            return false;
        }

        match event {
            LinkEvent::Message(text) => {
                self.handle_message(generation, &text);
                true
            }
            LinkEvent::Error(message) => {
                debug!(error = %message, "Connection error");
                self.emit(vec![Notice::Error(message)]);
                true
            }
            LinkEvent::Closed => {
                self.on_close(generation);
                false
            }
        }
    }

    fn on_close(&self, generation: u64) {
        let mut notices = Vec::new();
        {
            let mut shared = self.inner.shared.lock();
            if shared.generation != generation {
                return;
            }
            shared.requests.clear();
            shared.link = None;
            shared.register_id = None;
            shared.set_state(State::Disconnected, &mut notices);
        }
        debug!(url = %self.inner.url, "WebSocket closed");
        self.emit(notices);
    }
}

// ============================================================================
// Inbound Dispatch
// ============================================================================

impl Session {
    fn handle_message(&self, generation: u64, text: &str) {
        let frame = match InboundFrame::decode(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, frame = %text, "Dropping malformed frame");
                return;
            }
        };

        match frame.frame_type {
            FrameType::Hello => self.on_hello(generation, &frame),
            FrameType::Registered => self.on_registered(generation, &frame),
            FrameType::Response => self.on_response(generation, &frame),
            FrameType::Error => self.on_error_frame(generation, &frame),
            FrameType::P2p => self.on_p2p(generation, &frame),
            FrameType::Unknown => debug!(frame = %text, "Ignoring frame of unknown type"),
        }
    }

    fn on_hello(&self, generation: u64, frame: &InboundFrame) {
        if frame.payload.is_none() {
            warn!("No payload in hello message");
            return;
        }

        let key = self.inner.key_store.key();
        let mut notices = Vec::new();
        {
            let mut shared = self.inner.shared.lock();
            if shared.generation != generation {
                return;
            }
            shared.set_state(State::Registering, &mut notices);

            let id = shared.next_request_id();
            shared.register_id = Some(id);
            debug!(id, has_key = key.is_some(), "Sending register");
            shared.send_frame(&OutboundFrame::Register {
                id,
                payload: RegisterPayload::prompt(key),
            });
        }
        self.emit(notices);
    }

    fn on_registered(&self, generation: u64, frame: &InboundFrame) {
        if frame.payload.is_none() {
            warn!("No payload in registered message");
            return;
        }

        if let Some(key) = frame.payload_str("client-key")
            && let Err(e) = self.inner.key_store.store_key(key)
        {
            warn!(error = %e, "Failed to store pairing key");
        }

        let mut notices = Vec::new();
        let drained = {
            let mut shared = self.inner.shared.lock();
            if shared.generation != generation {
                return;
            }
            shared.register_id = None;
            shared.set_state(State::Registered, &mut notices);

            let drained = shared.offline.len();
            while let Some(command) = shared.offline.pop_front() {
                shared.dispatch(command);
            }
            drained
        };

        info!(url = %self.inner.url, drained, "Registered with TV");
        self.emit(notices);
    }

    fn on_response(&self, generation: u64, frame: &InboundFrame) {
        let Some(id) = frame.id else {
            debug!("Response without id");
            return;
        };

        let command = {
            let mut shared = self.inner.shared.lock();
            if shared.generation != generation {
                return;
            }
            if shared.register_id == Some(id) {
                info!("Waiting for the pairing prompt to be accepted on the TV");
                return;
            }
            let Some(command) = shared.requests.resolve(id) else {
                warn!(id, "Received a response for which no request was found");
                return;
            };
            shared.requests.complete(id);
            command
        };

        match &frame.payload {
            Some(payload) => command.process_response(payload),
            None => debug!(id, "No payload in response message"),
        }
    }

    fn on_p2p(&self, generation: u64, frame: &InboundFrame) {
        let (Some(from), Some(payload)) = (frame.from.as_deref(), frame.payload.as_ref()) else {
            warn!("Dropping p2p message without sender or payload");
            return;
        };
        if !self.is_current(generation) {
            return;
        }

        let handler = self.inner.p2p_handler.read().clone();
        match handler {
            Some(handler) => handler.on_p2p_message(from, payload),
            None => debug!(from, "No handler for web app message"),
        }
    }

    fn on_error_frame(&self, generation: u64, frame: &InboundFrame) {
        let message = frame.error_message().to_string();

        let route = {
            let mut shared = self.inner.shared.lock();
            if shared.generation != generation {
                return;
            }

            let registration = match frame.id {
                Some(id) => shared.register_id == Some(id),
                None => shared.state == State::Registering,
            };

            if registration {
                ErrorRoute::Registration
            } else if let Some(id) = frame.id
                && let Some(command) = shared.requests.resolve(id)
            {
                shared.requests.complete(id);
                ErrorRoute::Command(command)
            } else {
                ErrorRoute::Unmatched
            }
        };

        match route {
            ErrorRoute::Command(command) => {
                debug!(error = %message, "Request failed");
                command.process_error(&message);
            }
            ErrorRoute::Registration => {
                warn!(error = %message, "Registration failed");
                self.emit(vec![Notice::RegistrationFailed(message)]);
                self.disconnect();
            }
            ErrorRoute::Unmatched => {
                warn!(id = ?frame.id, error = %message, "No matching request found for error message");
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
