//! Connection and pairing options for a TV session.
//!
//! A [`SessionConfig`] is produced by [`SessionConfigBuilder`](super::SessionConfigBuilder)
//! and is immutable afterwards; the session keeps its own copy.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use url::Url;

use crate::error::Result;

use super::SessionConfigBuilder;

// ============================================================================
// Constants
// ============================================================================

/// Default SSAP port (TLS).
pub const DEFAULT_PORT: u16 = 3001;

/// Delay between reconnection attempts while the TV is unreachable.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(10);

/// Application id announced in the `hello` frame.
pub const DEFAULT_APP_ID: &str = "org.webosremote";

/// Application name shown on the TV's pairing prompt.
pub const DEFAULT_APP_NAME: &str = "webos-remote";

/// Region announced in the `hello` frame.
pub const DEFAULT_APP_REGION: &str = "United States";

// ============================================================================
// SessionConfig
// ============================================================================

/// Validated configuration for one TV session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Host name or IP address of the TV.
    pub host: String,

    /// SSAP port.
    pub port: u16,

    /// Use `wss` (TLS) instead of plain `ws`.
    pub secure: bool,

    /// Accept the TV's self-signed certificate.
    pub accept_invalid_certs: bool,

    /// Application id sent in `hello`.
    pub app_id: String,

    /// Application name sent in `hello`.
    pub app_name: String,

    /// Application region sent in `hello`.
    pub app_region: String,

    /// Reconnection supervisor tick interval.
    pub reconnect_interval: Duration,
}

// ============================================================================
// Constructors
// ============================================================================

impl SessionConfig {
    /// Creates a new builder.
    #[inline]
    #[must_use]
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::new()
    }

    /// Creates a configuration for `host` with all defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the host is empty.
    pub fn for_host(host: impl Into<String>) -> Result<Self> {
        SessionConfigBuilder::new().host(host).build()
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl SessionConfig {
    /// Returns the URI scheme (`wss` or `ws`).
    #[inline]
    #[must_use]
    pub fn scheme(&self) -> &'static str {
        if self.secure { "wss" } else { "ws" }
    }

    /// Builds the destination URI of the TV's SSAP endpoint.
    ///
    /// IPv6 literals are bracketed automatically.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Url`](crate::Error::Url) if the host is not a valid URI host.
    pub fn url(&self) -> Result<Url> {
        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };

        let url = Url::parse(&format!("{}://{}:{}", self.scheme(), host, self.port))?;
        Ok(url)
    }
}

// ============================================================================
// Tests
// ============================================================================
