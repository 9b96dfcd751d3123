//! Chat client handle.
//!
//! [`ChatClient`] is a cheap clonable handle over the dispatch task that
//! owns the WebSocket. Verbs are forwarded as commands and resolve when the
//! task has acted on them; observers read lock-free mirrors the task keeps
//! up to date.
//!
//! # Example
//!
//! ```no_run
//! use chat_transport::{ChatClient, ClientMessage};
//! use serde_json::json;
//!
//! # async fn example() -> chat_transport::Result<()> {
//! let client = ChatClient::builder()
//!     .base_url("https://agent.example.com")
//!     .token("user-session-token")
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
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::ConversationId;
use crate::protocol::ClientMessage;
use crate::transport::{
    Command, ConnectionState, SharedState, TransportCallbacks, TransportStatsSnapshot,
    spawn_connection,
};

use super::builder::ChatClientBuilder;
use super::options::{Credentials, TransportOptions};

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for the client handle.
pub(crate) struct ClientInner {
    /// Canonical backend base URL.
    base_url: Url,

    /// Command channel into the dispatch task.
    command_tx: mpsc::UnboundedSender<Command>,

    /// Mirrors maintained by the dispatch task.
    shared: Arc<SharedState>,
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        // Last handle gone; the dispatch task has no caller left to serve.
        let _ = self.command_tx.send(Command::Shutdown);
        debug!("chat client dropped");
    }
}

// ============================================================================
// ChatClient
// ============================================================================

/// Handle to a persistent chat connection.
///
/// The handle is responsible for:
/// - Opening and closing the WebSocket transport
/// - Sending messages, buffered until the session is ready
/// - Exposing connection state, the bound conversation, and counters
///
/// All clones address the same connection; dropping the last clone shuts
/// the dispatch task down.
#[derive(Clone)]
pub struct ChatClient {
    /// Shared inner state.
    pub(crate) inner: Arc<ClientInner>,
}

// ============================================================================
// ChatClient - Display
// ============================================================================

impl fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("state", &self.state())
            .field("ready", &self.is_ready())
            .field("cid", &self.cid())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ChatClient - Public API
// ============================================================================

impl ChatClient {
    /// Creates a configuration builder for the client.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use chat_transport::ChatClient;
    ///
    /// # fn example() -> chat_transport::Result<()> {
    /// let client = ChatClient::builder()
    ///     .base_url("https://agent.example.com")
    ///     .token("user-session-token")
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    #[inline]
    #[must_use]
    pub fn builder() -> ChatClientBuilder {
        ChatClientBuilder::new()
    }

    /// Opens the transport, optionally binding a conversation.
    ///
    /// Resolves once the transport is open. Safe to call repeatedly: while
    /// a dial or retry is pending it is a no-op, and while the transport is
    /// open with a different conversation it rebinds in place instead of
    /// reopening.
    ///
    /// # Errors
    ///
    /// Returns the dial error when the first attempt fails; automatic
    /// retries continue in the background regardless.
    pub async fn connect(&self, cid: Option<ConversationId>) -> Result<()> {
        self.dispatch(|ack| Command::Connect { cid, ack }).await
    }

    /// Sends a message, buffering it until the session is ready.
    ///
    /// Resolves once the message is on the wire.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] when no transport is open or pending
    /// - [`Error::ConnectionClosed`] when the connection is torn down
    ///   before the message is transmitted
    pub async fn send(&self, message: ClientMessage) -> Result<()> {
        self.dispatch(|ack| Command::Send { message, ack }).await
    }

    /// Rebinds the session to another conversation.
    ///
    /// On an open transport this sends a single bind frame; otherwise the
    /// new binding takes effect on the next dial.
    pub async fn bind_cid(&self, cid: impl Into<ConversationId>) -> Result<()> {
        let cid = cid.into();
        self.dispatch(|ack| Command::BindCid { cid, ack }).await
    }

    /// Deliberately closes the transport.
    ///
    /// Cancels any scheduled reconnect, rejects queued messages, and does
    /// not reconnect. Idempotent.
    pub async fn close(&self) -> Result<()> {
        self.dispatch(|ack| Command::Close { ack }).await
    }

    /// Closes the transport and forgets the bound conversation and retry
    /// counters.
    pub async fn reset(&self) -> Result<()> {
        self.dispatch(|ack| Command::Reset { ack }).await
    }

    /// Leaves any terminal state and dials immediately.
    ///
    /// Resets the reconnect budget and skips any backoff delay in
    /// progress. This is the only way out of
    /// [`ConnectionState::Kicked`] and [`ConnectionState::Failed`].
    pub async fn manual_reconnect(&self) -> Result<()> {
        self.dispatch(|ack| Command::ManualReconnect { ack }).await
    }
}

// ============================================================================
// ChatClient - Observers
// ============================================================================

impl ChatClient {
    /// Returns the current connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.shared.state()
    }

    /// Returns `true` once the session is ready to carry messages.
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.inner.shared.is_ready()
    }

    /// Returns the conversation currently bound, if any.
    #[inline]
    #[must_use]
    pub fn cid(&self) -> Option<ConversationId> {
        self.inner.shared.cid()
    }

    /// Returns the number of reconnect attempts in the current retry
    /// cycle. Zero while connected.
    #[inline]
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.shared.attempts()
    }

    /// Takes a point-in-time copy of the transport counters.
    #[inline]
    #[must_use]
    pub fn stats(&self) -> TransportStatsSnapshot {
        self.inner.shared.stats().snapshot()
    }

    /// Returns the canonical backend base URL.
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }
}

// ============================================================================
// ChatClient - Internal API
// ============================================================================

impl ChatClient {
    /// Creates a client and spawns its dispatch task.
    pub(crate) fn new(
        base_url: Url,
        options: TransportOptions,
        credentials: Credentials,
        callbacks: TransportCallbacks,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        let (command_tx, shared) = spawn_connection(
            &base_url,
            options,
            credentials,
            callbacks,
            shutdown,
        )?;
        debug!(url = %base_url, "chat client created");

        Ok(Self {
            inner: Arc::new(ClientInner {
                base_url,
                command_tx,
                shared,
            }),
        })
    }

    /// Sends one command and waits for the dispatch task to acknowledge it.
    ///
    /// A closed command channel on either leg means the dispatch task is
    /// gone, which callers observe as a closed connection.
    async fn dispatch(
        &self,
        command: impl FnOnce(oneshot::Sender<Result<()>>) -> Command,
    ) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.inner
            .command_tx
            .send(command(ack_tx))
            .map_err(|_| Error::ConnectionClosed)?;
        ack_rx.await.map_err(|_| Error::ConnectionClosed)?
    }
}

// ============================================================================
// Tests
// ============================================================================
