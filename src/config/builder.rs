//! Builder pattern for session configuration.
//!
//! Provides a fluent API for configuring and validating [`SessionConfig`]
//! instances.
//!
//! # Example
//!
//! ```no_run
//! use webos_remote::SessionConfig;
//!
//! # fn example() -> webos_remote::Result<()> {
//! let config = SessionConfig::builder()
//!     .host("192.168.1.20")
//!     .app_name("Living Room Hub")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};

use super::options::{
    DEFAULT_APP_ID, DEFAULT_APP_NAME, DEFAULT_APP_REGION, DEFAULT_PORT,
    DEFAULT_RECONNECT_INTERVAL, SessionConfig,
};

// ============================================================================
// SessionConfigBuilder
// ============================================================================

/// Builder for configuring a [`SessionConfig`].
///
/// Use [`SessionConfig::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct SessionConfigBuilder {
    /// Host name or IP address.
    host: Option<String>,
    /// SSAP port.
    port: Option<u16>,
    /// Plain `ws` when `Some(false)`.
    secure: Option<bool>,
    /// Certificate verification override.
    accept_invalid_certs: Option<bool>,
    /// `hello` application id.
    app_id: Option<String>,
    /// `hello` application name.
    app_name: Option<String>,
    /// `hello` application region.
    app_region: Option<String>,
    /// Reconnection tick interval.
    reconnect_interval: Option<Duration>,
}

// ============================================================================
// SessionConfigBuilder Implementation
// ============================================================================

impl SessionConfigBuilder {
    /// Creates a new builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the TV host name or IP address.
    #[inline]
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the SSAP port (default 3001).
    #[inline]
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Selects `wss` (default) or plain `ws`.
    #[inline]
    #[must_use]
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = Some(secure);
        self
    }

    /// Accepts or rejects the TV's self-signed certificate (default: accept).
    #[inline]
    #[must_use]
    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = Some(accept);
        self
    }

    /// Sets the application id announced to the TV.
    #[inline]
    #[must_use]
    pub fn app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    /// Sets the application name shown on the pairing prompt.
    #[inline]
    #[must_use]
    pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    /// Sets the application region announced to the TV.
    #[inline]
    #[must_use]
    pub fn app_region(mut self, app_region: impl Into<String>) -> Self {
        self.app_region = Some(app_region.into());
        self
    }

    /// Sets the reconnection supervisor interval (default 10s).
    #[inline]
    #[must_use]
    pub fn reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = Some(interval);
        self
    }

    /// Builds the configuration with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the host is missing or empty
    /// - [`Error::Config`] if the port or reconnect interval is zero
    /// - [`Error::Url`] if the host cannot form a valid URI
    pub fn build(self) -> Result<SessionConfig> {
        let host = self.validate_host()?;
        let port = self.port.unwrap_or(DEFAULT_PORT);
        if port == 0 {
            return Err(Error::config("Port must be non-zero"));
        }

        let reconnect_interval = self.reconnect_interval.unwrap_or(DEFAULT_RECONNECT_INTERVAL);
        if reconnect_interval.is_zero() {
            return Err(Error::config("Reconnect interval must be > 0"));
        }

        let config = SessionConfig {
            host,
            port,
            secure: self.secure.unwrap_or(true),
            accept_invalid_certs: self.accept_invalid_certs.unwrap_or(true),
            app_id: self.app_id.unwrap_or_else(|| DEFAULT_APP_ID.to_string()),
            app_name: self.app_name.unwrap_or_else(|| DEFAULT_APP_NAME.to_string()),
            app_region: self
                .app_region
                .unwrap_or_else(|| DEFAULT_APP_REGION.to_string()),
            reconnect_interval,
        };

        config.url()?;
        Ok(config)
    }
}

// ============================================================================
// Validation
// ============================================================================

impl SessionConfigBuilder {
    /// Validates the host configuration.
    fn validate_host(&self) -> Result<String> {
        let host = self.host.as_deref().map(str::trim).unwrap_or_default();
        if host.is_empty() {
            return Err(Error::config(
                "TV host is required. Use .host() to set it.\n\
                 Example: SessionConfig::builder().host(\"192.168.1.20\")",
            ));
        }
        Ok(host.to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================
