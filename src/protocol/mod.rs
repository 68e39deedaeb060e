//! SSAP WebSocket protocol message types.
//!
//! This module defines the JSON frames exchanged with the TV and the value
//! types carried in their payloads.
//!
//! # Protocol Overview
//!
//! | Frame `type` | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `hello` | Local → TV, TV → Local | Opens the handshake |
//! | `register` | Local → TV | Pairing request with permission manifest |
//! | `registered` | TV → Local | Pairing accepted, carries `client-key` |
//! | `request` | Local → TV | One-shot command |
//! | `subscribe` | Local → TV | Persistent subscription |
//! | `unsubscribe` | Local → TV | Cancels a subscription |
//! | `response` | TV → Local | Result for a request/subscription id |
//! | `error` | TV → Local | Failure for a request id |
//! | `p2p` | Local → TV | App-to-app message, no id correlation |
//!
//! # Endpoint Naming
//!
//! Commands target `ssap://` URIs:
//!
//! - `ssap://audio/setVolume`
//! - `ssap://tv/getChannelList`
//! - `ssap://system.launcher/launch`
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `message` | Inbound/outbound frame codec |
//! | `types` | Payload value types |

// ============================================================================
// Submodules
// ============================================================================

/// Inbound and outbound frame codec.
pub mod message;

/// Payload value types.
pub mod types;

// ============================================================================
// Re-exports
// ============================================================================

pub use message::{
    FrameType, HelloPayload, InboundFrame, Manifest, OutboundFrame, PERMISSIONS, PairingType,
    RegisterPayload, RequestId, RequestKind, encode_p2p, is_p2p,
};
pub use types::{
    AppInfo, ChannelInfo, LaunchSession, LaunchSessionType, PlayState, TextInputStatus,
    required_field,
};
