//! Chat transport - persistent WebSocket client for agent dashboards.
//!
//! This library keeps a duplex chat channel between a dashboard and an AI
//! agent backend alive across network failures, server restarts, and
//! session handover, without the consumer managing any of it.
//!
//! # Architecture
//!
//! A single spawned dispatch task owns the WebSocket:
//!
//! - **Handle (consumer)**: sends commands, observes state mirrors
//! - **Dispatch task**: dials, reads frames, flushes the queue, reconnects
//!
//! Key design principles:
//!
//! - Every verb is a command acknowledged by the dispatch task (no locks
//!   around the socket)
//! - Messages sent before the session is ready are buffered, not dropped
//! - Unexpected closes probe backend health to pick a backoff curve
//! - Server verdicts (kicked, auth failure) latch terminal states that
//!   only a manual reconnect leaves
//!
//! # Quick Start
//!
//! ```no_run
//! use chat_transport::{ChatClient, ClientMessage, Result};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = ChatClient::builder()
//!         .base_url("https://agent.example.com")
//!         .token("user-session-token")
//!         .on_event(|event| println!("{}: {:?}", event.kind, event.data))
//!         .on_state(|state| println!("connection is {state}"))
//!         .build()?;
//!
//!     // Open the transport bound to a conversation
//!     client.connect(Some("conv-42".into())).await?;
//!
//!     // Resolves once the message is on the wire
//!     client
//!         .send(ClientMessage::user_message(json!({ "text": "hello" })))
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Client handle and configuration builder |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Wire message types |
//! | [`transport`] | Dispatch task, backoff, health probe (internal) |
//!
//! # Features
//!
//! - **Resilient**: health-probed exponential backoff with jitter
//! - **Ordered**: queued messages flush first-in first-out on readiness
//! - **Observable**: state, readiness, and counters readable without locks
//! - **Honest errors**: each send resolves only when its frame is on the
//!   wire, or fails telling you why

// ============================================================================
// Modules
// ============================================================================

/// Chat client handle and configuration.
///
/// Use [`ChatClient::builder()`] to create a configured client instance.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for chat entities.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// WebSocket protocol message types.
///
/// Envelope structures for both directions of the wire.
pub mod protocol;

/// WebSocket transport layer.
///
/// Internal module handling the dispatch task and reconnection machinery.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{ChatClient, ChatClientBuilder, Credentials, TransportOptions};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ConversationId, DeviceToken};

// Protocol types
pub use protocol::{ClientMessage, ClientMessageKind, CloseCause, ControlEvent, ServerEvent};

// Transport observables
pub use transport::{BackoffConfig, ConnectionState, TransportStatsSnapshot};
