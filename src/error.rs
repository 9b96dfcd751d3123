//! Error types for the chat transport.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use chat_transport::{Result, ClientMessage};
//!
//! async fn example(client: &ChatClient) -> Result<()> {
//!     client.send(ClientMessage::ping()).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`], [`Error::NotConnected`] |
//! | Terminal | [`Error::AuthFailed`], [`Error::Kicked`], [`Error::Banned`], [`Error::RateLimited`], [`Error::ConfigChanged`], [`Error::ReconnectExhausted`] |
//! | Protocol | [`Error::Protocol`] |
//! | Execution | [`Error::Timeout`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |
//!
//! Terminal variants correspond to disconnect causes that must never trigger
//! an automatic reconnect; see [`Error::is_terminal`].

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when client configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    ///
    /// Returned when the connection cannot be established.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Connection timeout waiting for the transport to open.
    ///
    /// Returned when no open event arrives within the timeout period.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Connection torn down before a queued message was transmitted.
    ///
    /// Every message still queued when the connection is closed, kicked,
    /// or reconnect-exhausted is rejected with this variant.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Send attempted while fully disconnected.
    ///
    /// Returned when `send()` is called and no connection is open or pending.
    #[error("Not connected")]
    NotConnected,

    // ========================================================================
    // Terminal Disconnect Causes
    // ========================================================================
    /// Authentication rejected by the server (close code 4001).
    #[error("Authentication failed")]
    AuthFailed,

    /// Session superseded by another client (close code 4002).
    ///
    /// Another connection bound the same session; this one was kicked.
    #[error("Session superseded by another connection")]
    Kicked,

    /// Account banned (close code 4003).
    #[error("Account banned")]
    Banned,

    /// Rate limited by the server (close code 4429).
    #[error("Rate limited by server")]
    RateLimited,

    /// Server configuration changed (close code 4004).
    ///
    /// The client must be reloaded to pick up the new configuration.
    #[error("Server configuration changed, reload required")]
    ConfigChanged,

    /// Reconnect attempt ceiling reached.
    ///
    /// Distinct from the other terminal causes so callers can offer a
    /// manual-retry affordance specifically.
    #[error("Gave up reconnecting after {attempts} attempts")]
    ReconnectExhausted {
        /// Number of consecutive failed attempts.
        attempts: u32,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Protocol violation or malformed frame.
    ///
    /// Returned when a message envelope cannot be interpreted.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// Operation timeout.
    ///
    /// Returned when an operation exceeds its timeout duration.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Creates a reconnect exhausted error.
    #[inline]
    pub fn reconnect_exhausted(attempts: u32) -> Self {
        Self::ReconnectExhausted { attempts }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. } | Self::Timeout { .. }
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::NotConnected
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this is a terminal disconnect cause.
    ///
    /// Terminal causes block automatic reconnection; only an explicit
    /// manual reconnect may open a new connection afterwards.
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::AuthFailed
                | Self::Kicked
                | Self::Banned
                | Self::RateLimited
                | Self::ConfigChanged
                | Self::ReconnectExhausted { .. }
        )
    }

    /// Returns `true` if this error may succeed on retry.
    ///
    /// Retryable errors drive the reconnection policy.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::Timeout { .. }
                | Self::WebSocket(_)
                | Self::Io(_)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
