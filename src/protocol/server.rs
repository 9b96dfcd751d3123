//! Inbound event types.
//!
//! Events are frames sent by the agent runtime: data events (message deltas,
//! tool activity, file updates) and connection-management events (readiness
//! acks, kick/expiry/logout notices).
//!
//! The transport intercepts connection-management kinds and forwards every
//! other kind opaquely to the registered event callback in arrival order.
//!
//! See ARCHITECTURE.md Section 2.3 for the envelope contract.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

use super::now_ms;

// ============================================================================
// ServerEvent
// ============================================================================

/// An inbound event envelope.
///
/// # Format
///
/// ```json
/// {
///   "type": "message_delta",
///   "data": { ... },
///   "timestamp": 1700000000000
/// }
/// ```
///
/// `kind` stays a plain string so unknown data-event kinds pass through to
/// the consumer untouched; only the kinds listed in [`ControlEvent`] are
/// interpreted by the transport itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerEvent {
    /// Event kind discriminator.
    #[serde(rename = "type")]
    pub kind: String,

    /// Kind-specific payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Server-assigned time, epoch milliseconds.
    ///
    /// Always present after [`ServerEvent::parse`]; stamped on arrival when
    /// the server omitted it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

impl ServerEvent {
    /// Parses an inbound frame, stamping a timestamp if the server omitted one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the frame is not a valid event envelope.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut event: Self = serde_json::from_str(raw)
            .map_err(|e| Error::protocol(format!("malformed event frame: {e}")))?;
        event.timestamp.get_or_insert_with(now_ms);
        Ok(event)
    }

    /// Returns the intercepted control meaning of this event, if any.
    ///
    /// `state_update` is the readiness ack; `state` is its legacy name and
    /// `connected` the initial announcement, all treated identically.
    #[must_use]
    pub fn control(&self) -> Option<ControlEvent> {
        match self.kind.as_str() {
            "connected" | "state_update" | "state" => Some(ControlEvent::Ready),
            "session_replaced" => Some(ControlEvent::SessionReplaced),
            "session_expired" => Some(ControlEvent::SessionExpired),
            "force_logout" => Some(ControlEvent::ForceLogout),
            "rate_limited" => Some(ControlEvent::RateLimited),
            _ => None,
        }
    }

    /// Returns `true` if this event is intercepted by the transport.
    #[inline]
    #[must_use]
    pub fn is_control(&self) -> bool {
        self.control().is_some()
    }

    /// Returns the event timestamp, epoch milliseconds.
    #[inline]
    #[must_use]
    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp.unwrap_or_default()
    }

    /// Gets a string value from the payload.
    ///
    /// Returns empty string if key not found or not a string.
    #[inline]
    #[must_use]
    pub fn get_string(&self, key: &str) -> String {
        self.data
            .as_ref()
            .and_then(|v| v.get(key))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    }

    /// Gets a u64 value from the payload.
    ///
    /// Returns 0 if key not found or not a number.
    #[inline]
    #[must_use]
    pub fn get_u64(&self, key: &str) -> u64 {
        self.data
            .as_ref()
            .and_then(|v| v.get(key))
            .and_then(|v| v.as_u64())
            .unwrap_or_default()
    }

    /// Gets a boolean value from the payload.
    ///
    /// Returns false if key not found or not a boolean.
    #[inline]
    #[must_use]
    pub fn get_bool(&self, key: &str) -> bool {
        self.data
            .as_ref()
            .and_then(|v| v.get(key))
            .and_then(|v| v.as_bool())
            .unwrap_or_default()
    }
}

// ============================================================================
// ControlEvent
// ============================================================================

/// Connection-management events intercepted by the transport.
///
/// These never reach the consumer's event callback; they drive the state
/// machine instead. Terminal variants mirror their close-code counterparts
/// because the server may signal them either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    /// Server is ready to process client messages.
    Ready,

    /// Session bound by another connection; this one is kicked.
    SessionReplaced,

    /// Authenticated session expired; re-authentication required.
    SessionExpired,

    /// Server forced a logout.
    ForceLogout,

    /// Server applied rate limiting.
    RateLimited,
}

impl ControlEvent {
    /// Returns `true` if this control event terminates the connection.
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Ready)
    }
}

// ============================================================================
// Tests
// ============================================================================
