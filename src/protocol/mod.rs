//! WebSocket protocol message types.
//!
//! This module defines the message format for communication between the
//! client and the agent runtime backend.
//!
//! # Protocol Overview
//!
//! From ARCHITECTURE.md Section 2:
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | [`ClientMessage`] | Client → Server | User intent, heartbeat, session binding |
//! | [`ServerEvent`] | Server → Client | Data events and connection management |
//!
//! Both directions share the same envelope shape:
//!
//! ```json
//! { "type": "<kind>", "data": { ... }, "timestamp": 1700000000000 }
//! ```
//!
//! `data` and `timestamp` are optional; inbound frames missing a timestamp
//! are stamped on arrival. Connection-management kinds (readiness acks,
//! kick/expiry/logout notices) are intercepted by the transport; every other
//! inbound kind is forwarded opaquely to the registered event callback.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `client` | Outbound [`ClientMessage`] and its kinds |
//! | `server` | Inbound [`ServerEvent`] and intercepted [`ControlEvent`]s |
//! | `close` | [`CloseCause`] classification of close codes |

// ============================================================================
// Submodules
// ============================================================================

/// Outbound message types.
pub mod client;

/// Close-code classification.
pub mod close;

/// Inbound event types.
pub mod server;

// ============================================================================
// Re-exports
// ============================================================================

pub use client::{ClientMessage, ClientMessageKind};
pub use close::CloseCause;
pub use server::{ControlEvent, ServerEvent};

// ============================================================================
// Helpers
// ============================================================================

/// Returns the current time as epoch milliseconds.
///
/// Used to stamp outbound messages at creation and inbound events that
/// arrive without a server timestamp.
#[inline]
#[must_use]
pub(crate) fn now_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
