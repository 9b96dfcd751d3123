//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and creating [`ChatClient`]
//! instances.
//!
//! # Example
//!
//! ```no_run
//! use chat_transport::ChatClient;
//!
//! # async fn example() -> chat_transport::Result<()> {
//! let client = ChatClient::builder()
//!     .base_url("https://agent.example.com")
//!     .token("user-session-token")
//!     .on_event(|event| println!("{}", event.kind))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::identifiers::DeviceToken;
use crate::protocol::ServerEvent;
use crate::transport::{BackoffConfig, ConnectionState, TransportCallbacks};

use super::core::ChatClient;
use super::options::{Credentials, TransportOptions, normalize_base_url};

// ============================================================================
// ChatClientBuilder
// ============================================================================

/// Builder for configuring a [`ChatClient`] instance.
///
/// Use [`ChatClient::builder()`] to create a new builder.
#[derive(Default)]
pub struct ChatClientBuilder {
    /// Backend base URL.
    base_url: Option<String>,
    /// Bearer token for the dial URL.
    token: Option<String>,
    /// Optional device token for the dial URL.
    device_token: Option<DeviceToken>,
    /// Transport tuning knobs.
    options: TransportOptions,
    /// Consumer callbacks.
    callbacks: TransportCallbacks,
    /// External shutdown signal.
    shutdown: Option<CancellationToken>,
}

// ============================================================================
// ChatClientBuilder - Endpoint and Credentials
// ============================================================================

impl ChatClientBuilder {
    /// Creates a new client builder with default tuning.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the backend base URL.
    ///
    /// Accepts `http(s)` or `ws(s)` schemes; the chat endpoint and health
    /// probe paths are derived from it.
    #[inline]
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the bearer token sent in the dial URL.
    #[inline]
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets the per-device token for online-duration accounting.
    #[inline]
    #[must_use]
    pub fn device_token(mut self, token: impl Into<DeviceToken>) -> Self {
        self.device_token = Some(token.into());
        self
    }
}

// ============================================================================
// ChatClientBuilder - Transport Tuning
// ============================================================================

impl ChatClientBuilder {
    /// Sets the WebSocket handshake timeout.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout = timeout;
        self
    }

    /// Sets the heartbeat ping interval.
    #[inline]
    #[must_use]
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.options.heartbeat_interval = interval;
        self
    }

    /// Sets the health probe timeout used between reconnect attempts.
    #[inline]
    #[must_use]
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.options.probe_timeout = timeout;
        self
    }

    /// Sets how long to wait for a readiness acknowledgement before
    /// assuming the session is ready.
    #[inline]
    #[must_use]
    pub fn ready_grace(mut self, grace: Duration) -> Self {
        self.options.ready_grace = grace;
        self
    }

    /// Enables or disables assuming readiness after the grace period.
    #[inline]
    #[must_use]
    pub fn implicit_ready(mut self, enabled: bool) -> Self {
        self.options.implicit_ready = enabled;
        self
    }

    /// Sets the reconnect attempt ceiling.
    #[inline]
    #[must_use]
    pub fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.options.max_reconnect_attempts = attempts;
        self
    }

    /// Replaces the backoff schedule.
    #[inline]
    #[must_use]
    pub fn backoff(mut self, config: BackoffConfig) -> Self {
        self.options.backoff = config;
        self
    }

    /// Replaces the whole options block at once.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: TransportOptions) -> Self {
        self.options = options;
        self
    }
}

// ============================================================================
// ChatClientBuilder - Callbacks and Shutdown
// ============================================================================

impl ChatClientBuilder {
    /// Registers the callback invoked for every data event.
    ///
    /// Connection-management events are intercepted by the transport and
    /// never reach this callback.
    #[must_use]
    pub fn on_event(mut self, callback: impl Fn(ServerEvent) + Send + Sync + 'static) -> Self {
        self.callbacks.on_event = Some(Box::new(callback));
        self
    }

    /// Registers the callback invoked on every state change.
    #[must_use]
    pub fn on_state(mut self, callback: impl Fn(ConnectionState) + Send + Sync + 'static) -> Self {
        self.callbacks.on_state = Some(Box::new(callback));
        self
    }

    /// Registers the callback invoked when an error is surfaced.
    ///
    /// A transport error followed by its own close is surfaced once, not
    /// twice.
    #[must_use]
    pub fn on_error(mut self, callback: impl Fn(Error) + Send + Sync + 'static) -> Self {
        self.callbacks.on_error = Some(Box::new(callback));
        self
    }

    /// Ties the client's lifetime to an external cancellation token.
    ///
    /// Cancelling the token tears the transport down silently, with no
    /// error callbacks and no reconnect.
    #[inline]
    #[must_use]
    pub fn shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = Some(token);
        self
    }
}

// ============================================================================
// ChatClientBuilder - Build
// ============================================================================

impl ChatClientBuilder {
    /// Builds the client and spawns its dispatch task.
    ///
    /// Must be called within a Tokio runtime. The client starts
    /// disconnected; call [`ChatClient::connect`] to open the transport.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the base URL or token is missing or invalid
    /// - [`Error::Config`] if the transport options fail validation
    pub fn build(self) -> Result<ChatClient> {
        let base_url = self.base_url.ok_or_else(|| {
            Error::config(
                "base URL is required. Use .base_url() to set it.\n\
                 Example: ChatClient::builder().base_url(\"https://agent.example.com\")",
            )
        })?;
        let base_url = normalize_base_url(&base_url)?;

        let token = self.token.filter(|t| !t.is_empty()).ok_or_else(|| {
            Error::config(
                "auth token is required. Use .token() to set it.\n\
                 Example: ChatClient::builder().token(\"user-session-token\")",
            )
        })?;

        self.options.validate()?;

        let credentials = Credentials {
            token,
            device_token: self.device_token,
        };
        let shutdown = self.shutdown.unwrap_or_default();

        ChatClient::new(
            base_url,
            self.options,
            credentials,
            self.callbacks,
            shutdown,
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_creates_empty_builder() {
        let builder = ChatClientBuilder::new();
        assert!(builder.base_url.is_none());
        assert!(builder.token.is_none());
        assert!(builder.device_token.is_none());
        assert!(builder.shutdown.is_none());
    }

    #[test]
    fn test_build_fails_without_base_url() {
        let result = ChatClientBuilder::new().token("tok").build();
        let err = result.expect_err("missing base URL must fail");
        assert!(err.to_string().contains("base URL"));
    }

    #[test]
    fn test_build_fails_without_token() {
        let result = ChatClientBuilder::new()
            .base_url("http://127.0.0.1:9")
            .build();
        let err = result.expect_err("missing token must fail");
        assert!(err.to_string().contains("token"));
    }

    #[test]
    fn test_build_rejects_empty_token() {
        let result = ChatClientBuilder::new()
            .base_url("http://127.0.0.1:9")
            .token("")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_build_fails_with_invalid_url() {
        let result = ChatClientBuilder::new()
            .base_url("ftp://127.0.0.1:9")
            .token("tok")
            .build();
        let err = result.expect_err("bad scheme must fail");
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_build_fails_with_invalid_options() {
        let result = ChatClientBuilder::new()
            .base_url("http://127.0.0.1:9")
            .token("tok")
            .connect_timeout(Duration::ZERO)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_tuning_setters_land_in_options() {
        let builder = ChatClientBuilder::new()
            .connect_timeout(Duration::from_secs(1))
            .heartbeat_interval(Duration::from_secs(2))
            .probe_timeout(Duration::from_secs(3))
            .ready_grace(Duration::from_millis(4))
            .implicit_ready(false)
            .max_reconnect_attempts(7);

        assert_eq!(builder.options.connect_timeout, Duration::from_secs(1));
        assert_eq!(builder.options.heartbeat_interval, Duration::from_secs(2));
        assert_eq!(builder.options.probe_timeout, Duration::from_secs(3));
        assert_eq!(builder.options.ready_grace, Duration::from_millis(4));
        assert!(!builder.options.implicit_ready);
        assert_eq!(builder.options.max_reconnect_attempts, 7);
    }

    #[tokio::test]
    async fn test_build_spawns_disconnected_client() {
        let client = ChatClientBuilder::new()
            .base_url("ws://127.0.0.1:9")
            .token("tok")
            .build()
            .expect("valid config must build");
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(!client.is_ready());
    }
}
