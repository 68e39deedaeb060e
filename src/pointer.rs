//! Pointer input socket.
//!
//! The TV exposes a second, plain WebSocket for pointer and navigation
//! buttons. Its frames are not JSON but `key:value` lines terminated by an
//! empty line:
//!
//! ```text
//! type:move
//! dx:10
//! dy:-4
//! down:0
//!
//! ```
//!
//! The socket path is obtained from the main session; see
//! [`MouseControl`](crate::MouseControl).

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, trace};
use url::Url;

use crate::error::{Error, Result};
use crate::transport::{Connector, LinkEvent};

// ============================================================================
// ButtonKey
// ============================================================================

/// Navigation button sent over the pointer socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonKey {
    Home,
    Back,
    Up,
    Down,
    Left,
    Right,
    /// Any other key name the firmware accepts (e.g. `"ENTER"`).
    Other(String),
}

impl ButtonKey {
    /// Returns the wire name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Home => "HOME",
            Self::Back => "BACK",
            Self::Up => "UP",
            Self::Down => "DOWN",
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for ButtonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// PointerFrame
// ============================================================================

/// One pointer socket message.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerFrame {
    Click,
    Button(ButtonKey),
    Move { dx: f64, dy: f64, drag: bool },
    Scroll { dx: f64, dy: f64 },
}

impl PointerFrame {
    /// Encodes the frame as sent on the wire.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Click => "type:click\n\n".to_string(),
            Self::Button(key) => format!("type:button\nname:{key}\n\n"),
            Self::Move { dx, dy, drag } => {
                format!("type:move\ndx:{dx}\ndy:{dy}\ndown:{}\n\n", u8::from(*drag))
            }
            Self::Scroll { dx, dy } => format!("type:scroll\ndx:{dx}\ndy:{dy}\n\n"),
        }
    }
}

// ============================================================================
// PointerSocket
// ============================================================================

/// Connection state of a [`PointerSocket`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PointerState {
    #[default]
    Initial,
    Connecting,
    Connected,
    Disconnecting,
}

#[derive(Default)]
struct PointerShared {
    state: PointerState,
    link: Option<mpsc::UnboundedSender<String>>,
    generation: u64,
}

/// Client for the pointer input socket.
pub struct PointerSocket {
    connector: Arc<dyn Connector>,
    shared: Arc<Mutex<PointerShared>>,
}

impl fmt::Debug for PointerSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointerSocket")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl PointerSocket {
    /// Creates an unconnected socket.
    #[must_use]
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            shared: Arc::new(Mutex::new(PointerShared::default())),
        }
    }

    /// Returns the connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> PointerState {
        self.shared.lock().state
    }

    /// Connects to `url`.
    ///
    /// Returns `Ok(false)` without doing anything unless the socket is
    /// [`PointerState::Initial`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the socket cannot be opened; the
    /// state returns to `Initial`.
    pub async fn connect(&self, url: &Url) -> Result<bool> {
        let generation = {
            let mut shared = self.shared.lock();
            if shared.state != PointerState::Initial {
                debug!(state = ?shared.state, "Pointer socket already connecting");
                return Ok(false);
            }
            shared.state = PointerState::Connecting;
            shared.generation += 1;
            shared.generation
        };

        debug!(%url, "Connecting pointer socket");
        let link = match self.connector.connect(url).await {
            Ok(link) => link,
            Err(e) => {
                debug!(error = %e, "Pointer socket connection failed");
                self.shared.lock().state = PointerState::Initial;
                return Err(e);
            }
        };

        {
            let mut shared = self.shared.lock();
            if shared.generation != generation {
                return Ok(false);
            }
            shared.link = Some(link.outgoing);
            shared.state = PointerState::Connected;
        }

        tokio::spawn(drain(Arc::clone(&self.shared), link.incoming, generation));
        Ok(true)
    }

    /// Closes the socket and returns to `Initial`.
    pub fn disconnect(&self) {
        let mut shared = self.shared.lock();
        shared.state = PointerState::Disconnecting;
        shared.link = None;
        shared.generation += 1;
        shared.state = PointerState::Initial;
    }

    /// Clicks at the pointer position.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if the socket is not open
    /// - [`Error::ConnectionClosed`] if the socket closed underneath
    pub fn click(&self) -> Result<()> {
        self.send(&PointerFrame::Click)
    }

    /// Presses a navigation button.
    ///
    /// # Errors
    ///
    /// Same as [`click`](Self::click).
    pub fn button(&self, key: ButtonKey) -> Result<()> {
        self.send(&PointerFrame::Button(key))
    }

    /// Moves the pointer by a relative offset.
    ///
    /// # Errors
    ///
    /// Same as [`click`](Self::click).
    pub fn move_by(&self, dx: f64, dy: f64) -> Result<()> {
        self.send(&PointerFrame::Move { dx, dy, drag: false })
    }

    /// Moves the pointer with the button held.
    ///
    /// # Errors
    ///
    /// Same as [`click`](Self::click).
    pub fn drag_by(&self, dx: f64, dy: f64) -> Result<()> {
        self.send(&PointerFrame::Move { dx, dy, drag: true })
    }

    /// Scrolls by a relative offset.
    ///
    /// # Errors
    ///
    /// Same as [`click`](Self::click).
    pub fn scroll(&self, dx: f64, dy: f64) -> Result<()> {
        self.send(&PointerFrame::Scroll { dx, dy })
    }

    fn send(&self, frame: &PointerFrame) -> Result<()> {
        let text = frame.encode();
        let shared = self.shared.lock();
        let link = shared.link.as_ref().ok_or(Error::NotConnected)?;
        trace!(frame = %text, "Pointer frame out");
        link.send(text).map_err(|_| Error::ConnectionClosed)
    }
}

/// Logs inbound pointer traffic until the link closes.
async fn drain(
    shared: Arc<Mutex<PointerShared>>,
    mut incoming: mpsc::UnboundedReceiver<LinkEvent>,
    generation: u64,
) {
    while let Some(event) = incoming.recv().await {
        match event {
            LinkEvent::Message(text) => trace!(frame = %text, "Pointer frame in"),
            LinkEvent::Error(message) => debug!(error = %message, "Pointer socket error"),
            LinkEvent::Closed => break,
        }
    }

    let mut shared = shared.lock();
    if shared.generation == generation {
        debug!("Pointer socket closed");
        shared.link = None;
        shared.state = PointerState::Initial;
    }
}

/// Converts the `socketPath` reported by the TV into the plaintext endpoint.
///
/// # Errors
///
/// Returns [`Error::Url`] if the path is not a valid URL.
pub fn pointer_socket_url(socket_path: &str) -> Result<Url> {
    let path = socket_path
        .replace("wss:", "ws:")
        .replace(":3001/", ":3000/");
    Url::parse(&path).map_err(Error::from)
}

// ============================================================================
// Tests
// ============================================================================
