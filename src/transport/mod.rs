//! WebSocket transport layer.
//!
//! This module opens the socket to the TV and pumps text frames between
//! the socket and a pair of channels owned by the session.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Session (Rust) │                              │  WebOS TV       │
//! │                 │         WebSocket            │                 │
//! │  Link.outgoing ─┼─────────────────────────────►│  SSAP endpoint  │
//! │  Link.incoming ◄┼──────────────────────────────┤  wss://host:3001│
//! │                 │                              │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Link Lifecycle
//!
//! 1. [`Connector::connect`] - Open the socket, spawn the frame pump
//! 2. Frames written to `outgoing` are sent as text messages
//! 3. Inbound text arrives as [`LinkEvent::Message`]
//! 4. Dropping `outgoing` closes the socket; the pump ends with [`LinkEvent::Closed`]
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | WebSocket connector and frame pump |
//! | `tls` | rustls client configuration |

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use tokio::sync::mpsc;
use url::Url;

use crate::error::Result;

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connector and frame pump.
pub mod connection;

/// rustls client configuration.
pub mod tls;

#[cfg(test)]
pub(crate) mod mock;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::WsConnector;

// ============================================================================
// Link
// ============================================================================

/// Event produced by an open link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Inbound text frame.
    Message(String),
    /// Transport failure; always followed by [`LinkEvent::Closed`].
    Error(String),
    /// The socket is gone.
    Closed,
}

/// Channel pair attached to one open socket.
#[derive(Debug)]
pub struct Link {
    /// Text frames to transmit. Dropping every sender closes the socket.
    pub outgoing: mpsc::UnboundedSender<String>,
    /// Inbound events, ending with [`LinkEvent::Closed`].
    pub incoming: mpsc::UnboundedReceiver<LinkEvent>,
}

// ============================================================================
// Connector
// ============================================================================

/// Opens links to a WebSocket endpoint.
///
/// The session uses [`WsConnector`]; tests substitute a channel-backed
/// implementation.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connects to `url` and starts pumping frames.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket or TLS handshake fails.
    async fn connect(&self, url: &Url) -> Result<Link>;
}
