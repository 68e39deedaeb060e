//! WebOS Remote - Session client for LG WebOS televisions.
//!
//! This library keeps a persistent, self-healing connection to a TV over the
//! SSAP protocol (JSON over a secure WebSocket on port 3001) and exposes the
//! TV's functions as typed capability traits.
//!
//! # Architecture
//!
//! - **Session**: one WebSocket link, the `hello` / `register` handshake,
//!   request/response correlation, and an offline buffer for commands issued
//!   before registration completes
//! - **Capabilities**: [`WebOsTv`] implements one trait per feature area
//!   (volume, channels, apps, keyboard, pointer, ...)
//! - **Device**: wires a session to a reconnect supervisor so the link is
//!   re-established after the TV is switched off and on again
//!
//! Responses are delivered through listener callbacks; subscriptions keep
//! delivering until cancelled or the socket closes.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use webos_remote::command::listener;
//! use webos_remote::{Device, FileKeyStore, Launcher, SessionConfig, VolumeControl};
//!
//! #[tokio::main]
//! async fn main() -> webos_remote::Result<()> {
//!     let config = SessionConfig::for_host("192.168.1.20")?;
//!     let device = Device::new(config, Arc::new(FileKeyStore::open("tv-key.json")?))?;
//!     device.start();
//!
//!     // Sent as soon as the TV has accepted the pairing prompt.
//!     device.tv().set_volume(0.2, listener(|r| println!("volume: {r:?}")));
//!     device.tv().launch_app("netflix", listener(|r| println!("launch: {r:?}")));
//!
//!     tokio::signal::ctrl_c().await?;
//!     device.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`capability`] | [`WebOsTv`] and the capability traits |
//! | [`command`] | Commands, subscriptions and listeners |
//! | [`config`] | [`SessionConfig`] and its builder |
//! | [`device`] | [`Device`]: session plus reconnection |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`keystore`] | Pairing key persistence |
//! | [`pointer`] | Pointer input socket |
//! | [`protocol`] | SSAP wire frames and payload types |
//! | [`session`] | Connection state machine |
//! | [`supervisor`] | Periodic reconnection |
//! | [`transport`] | WebSocket transport layer |
//! | [`wol`] | Wake-on-LAN |

// ============================================================================
// Modules
// ============================================================================

/// Capability traits implemented by [`WebOsTv`].
pub mod capability;

/// Commands and subscriptions sent through a session.
pub mod command;

/// Session configuration.
///
/// Use [`SessionConfig::builder()`] or [`SessionConfig::for_host()`].
pub mod config;

/// Application-facing TV handle.
pub mod device;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Pairing key storage.
pub mod keystore;

/// Pointer input socket.
pub mod pointer;

/// SSAP protocol message types.
///
/// Wire frames and payload value types.
pub mod protocol;

/// Connection state machine and request correlation.
pub mod session;

/// Reconnection supervisor.
pub mod supervisor;

/// WebSocket transport layer.
///
/// Internal module handling the TLS WebSocket link.
pub mod transport;

/// Wake-on-LAN magic packets.
pub mod wol;

// ============================================================================
// Re-exports
// ============================================================================

// Capability types
pub use capability::{
    KeyInput, KeyboardInput, Launcher, MediaControl, MouseControl, PowerControl,
    TextInputControl, ToastControl, TvControl, VolumeControl, WebAppListener, WebAppMessaging,
    WebOsTv,
};

// Command types
pub use command::{Command, ResponseListener, ServiceCommand, Subscription};

// Configuration types
pub use config::{SessionConfig, SessionConfigBuilder};

// Device types
pub use device::Device;

// Error types
pub use error::{Error, Result};

// Key storage
pub use keystore::{FileKeyStore, KeyStore, MemoryKeyStore};

// Pointer types
pub use pointer::{ButtonKey, PointerSocket, PointerState};

// Payload types
pub use protocol::{
    AppInfo, ChannelInfo, LaunchSession, LaunchSessionType, PlayState, TextInputStatus,
};

// Session types
pub use session::{P2pHandler, Session, SessionListener, State};

// Supervisor
pub use supervisor::ReconnectSupervisor;

// Wake-on-LAN
pub use wol::{MacAddress, parse_mac, send_magic_packet};
