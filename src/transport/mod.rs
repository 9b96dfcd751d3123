//! WebSocket transport layer.
//!
//! Everything below the public client handle lives here: the dispatch task
//! that owns the socket, the backoff schedule it walks after an unexpected
//! close, the health probe that picks which schedule to walk, and the queue
//! that holds outbound messages until the session is ready.
//!
//! See ARCHITECTURE.md Section 3 for the transport specification.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │   ChatClient    │                              │  Chat Backend   │
//! │                 │         WebSocket            │                 │
//! │  Command ───────┼─────────────────────────────►│  /ws/chat       │
//! │  SharedState ◄──┼── dispatch task              │                 │
//! │                 │                              │  /health ◄──────┼─ probe
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `connect` dials the chat endpoint with credentials in the URL query.
//! 2. On open, outbound messages buffer until the server acknowledges the
//!    session (or the implicit-ready grace period elapses).
//! 3. An unexpected close probes backend health, then schedules a redial on
//!    the standard or server-restart backoff curve.
//! 4. Server verdicts (session replaced, auth failure) latch a terminal
//!    state that only a manual reconnect leaves.
//!
//! # Modules
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | `connection` | Dispatch task, connection state, shared mirrors |
//! | `backoff` | Exponential retry schedule with jitter |
//! | `health` | HTTP probe distinguishing outage from restart |
//! | `queue` | FIFO buffer for not-yet-ready outbound messages |

// ============================================================================
// Submodules
// ============================================================================

/// Exponential backoff schedule.
pub mod backoff;

/// Dispatch task and connection state machine.
pub mod connection;

/// Backend health probe.
pub mod health;

/// Outbound message queue.
pub mod queue;

// ============================================================================
// Re-exports
// ============================================================================

pub use backoff::{BackoffConfig, BackoffPolicy};
pub use connection::{
    ConnectionState, ErrorCallback, EventCallback, StateCallback, TransportStats,
    TransportStatsSnapshot,
};
pub use health::HealthProber;

pub(crate) use connection::{Command, SharedState, TransportCallbacks, spawn_connection};
