//! Session configuration.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SessionConfig`] | Validated connection and pairing settings |
//! | [`SessionConfigBuilder`] | Fluent configuration builder |
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use webos_remote::SessionConfig;
//!
//! # fn example() -> webos_remote::Result<()> {
//! let config = SessionConfig::builder()
//!     .host("192.168.1.20")
//!     .reconnect_interval(Duration::from_secs(30))
//!     .build()?;
//!
//! assert_eq!(config.url()?.as_str(), "wss://192.168.1.20:3001/");
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for session configuration.
pub mod builder;

/// Session options and defaults.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::SessionConfigBuilder;
pub use options::{
    DEFAULT_APP_ID, DEFAULT_APP_NAME, DEFAULT_APP_REGION, DEFAULT_PORT,
    DEFAULT_RECONNECT_INTERVAL, SessionConfig,
};
