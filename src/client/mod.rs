//! Chat client module.
//!
//! This module provides the main entry point for consumers of the crate.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ChatClient`] | Clonable handle to a persistent chat connection |
//! | [`ChatClientBuilder`] | Fluent configuration builder |
//! | [`TransportOptions`] | Timing and retry tuning knobs |
//! | [`Credentials`] | Token material carried in the dial URL |
//!
//! # Example
//!
//! ```no_run
//! use chat_transport::{ChatClient, ClientMessage, Result};
//! use serde_json::json;
//!
//! # async fn example() -> Result<()> {
//! let client = ChatClient::builder()
//!     .base_url("https://agent.example.com")
//!     .token("user-session-token")
//!     .on_event(|event| println!("event: {}", event.kind))
//!     .build()?;
//!
//! client.connect(Some("conv-42".into())).await?;
//! client
//!     .send(ClientMessage::user_message(json!({ "text": "hello" })))
//!     .await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for client configuration.
pub mod builder;

/// Core client handle implementation.
pub mod core;

/// Transport options, credentials, and URL derivation.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ChatClientBuilder;
pub use core::ChatClient;
pub use options::{Credentials, TransportOptions};

pub(crate) use options::ws_endpoint;
