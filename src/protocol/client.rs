//! Outbound message types.
//!
//! Defines the envelope for client-to-server messages and the discriminated
//! set of message kinds the backend recognizes.
//!
//! See ARCHITECTURE.md Section 2.2 for the envelope contract.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::identifiers::ConversationId;

use super::now_ms;

// ============================================================================
// ClientMessageKind
// ============================================================================

/// Discriminator for outbound messages.
///
/// Serialized as the `type` field of the envelope. The two editor kinds use
/// a dotted scope prefix on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientMessageKind {
    /// A user chat message.
    UserMessage,

    /// Resolution of a pending agent interrupt.
    ResumeInterrupt,

    /// Stop the in-flight agent run.
    Stop,

    /// Heartbeat; carries no payload.
    Ping,

    /// Bind (or rebind) the connection to a conversation.
    BindCid,

    /// Ask the server to retry a previously failed message.
    RetryMessage,

    /// Editor buffer changed.
    #[serde(rename = "editor.content_update")]
    EditorContentUpdate,

    /// Editor preview requested.
    #[serde(rename = "editor.request_preview")]
    EditorRequestPreview,
}

impl ClientMessageKind {
    /// Returns the wire name of this kind.
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserMessage => "user_message",
            Self::ResumeInterrupt => "resume_interrupt",
            Self::Stop => "stop",
            Self::Ping => "ping",
            Self::BindCid => "bind_cid",
            Self::RetryMessage => "retry_message",
            Self::EditorContentUpdate => "editor.content_update",
            Self::EditorRequestPreview => "editor.request_preview",
        }
    }
}

impl fmt::Display for ClientMessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ClientMessage
// ============================================================================

/// An outbound message envelope.
///
/// # Format
///
/// ```json
/// {
///   "type": "user_message",
///   "data": { "content": "hello" },
///   "timestamp": 1700000000000
/// }
/// ```
///
/// The timestamp is client-assigned at creation time; `data` is omitted from
/// the wire when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientMessage {
    /// Message kind discriminator.
    #[serde(rename = "type")]
    pub kind: ClientMessageKind,

    /// Kind-specific payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Client-assigned creation time, epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

impl ClientMessage {
    /// Creates a message with the given kind and payload, stamped now.
    #[inline]
    #[must_use]
    pub fn new(kind: ClientMessageKind, data: Option<Value>) -> Self {
        Self {
            kind,
            data,
            timestamp: Some(now_ms()),
        }
    }

    /// Creates a user chat message.
    #[inline]
    #[must_use]
    pub fn user_message(data: Value) -> Self {
        Self::new(ClientMessageKind::UserMessage, Some(data))
    }

    /// Creates an interrupt-resolution message.
    #[inline]
    #[must_use]
    pub fn resume_interrupt(data: Value) -> Self {
        Self::new(ClientMessageKind::ResumeInterrupt, Some(data))
    }

    /// Creates a stop message.
    #[inline]
    #[must_use]
    pub fn stop() -> Self {
        Self::new(ClientMessageKind::Stop, None)
    }

    /// Creates a heartbeat ping.
    #[inline]
    #[must_use]
    pub fn ping() -> Self {
        Self::new(ClientMessageKind::Ping, None)
    }

    /// Creates a session-bind message for the given conversation.
    #[inline]
    #[must_use]
    pub fn bind_cid(cid: &ConversationId) -> Self {
        Self::new(
            ClientMessageKind::BindCid,
            Some(json!({ "cid": cid.as_str() })),
        )
    }

    /// Creates a retry-request message.
    #[inline]
    #[must_use]
    pub fn retry_message(data: Value) -> Self {
        Self::new(ClientMessageKind::RetryMessage, Some(data))
    }

    /// Creates an editor content-update message.
    #[inline]
    #[must_use]
    pub fn editor_content_update(data: Value) -> Self {
        Self::new(ClientMessageKind::EditorContentUpdate, Some(data))
    }

    /// Creates an editor preview-request message.
    #[inline]
    #[must_use]
    pub fn editor_request_preview(data: Value) -> Self {
        Self::new(ClientMessageKind::EditorRequestPreview, Some(data))
    }

    /// Serializes the envelope to its wire form.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if the payload cannot be serialized.
    #[inline]
    pub fn to_wire(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_serialization() {
        let msg = ClientMessage::user_message(json!({ "content": "hello" }));
        let json = msg.to_wire().expect("serialize");

        assert!(json.contains("\"type\":\"user_message\""));
        assert!(json.contains("\"content\":\"hello\""));
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn test_ping_omits_data() {
        let msg = ClientMessage::ping();
        let json = msg.to_wire().expect("serialize");

        assert!(json.contains("\"type\":\"ping\""));
        assert!(!json.contains("\"data\""));
    }

    #[test]
    fn test_bind_cid_payload() {
        let cid = ConversationId::new("conv-B");
        let msg = ClientMessage::bind_cid(&cid);
        let json = msg.to_wire().expect("serialize");

        assert!(json.contains("\"type\":\"bind_cid\""));
        assert!(json.contains("\"cid\":\"conv-B\""));
    }

    #[test]
    fn test_editor_kinds_use_dotted_names() {
        let update = ClientMessage::editor_content_update(json!({ "text": "x" }));
        let preview = ClientMessage::editor_request_preview(json!({}));

        assert!(
            update
                .to_wire()
                .expect("serialize")
                .contains("\"type\":\"editor.content_update\"")
        );
        assert!(
            preview
                .to_wire()
                .expect("serialize")
                .contains("\"type\":\"editor.request_preview\"")
        );
    }

    #[test]
    fn test_kind_as_str_matches_wire_name() {
        let kinds = [
            ClientMessageKind::UserMessage,
            ClientMessageKind::ResumeInterrupt,
            ClientMessageKind::Stop,
            ClientMessageKind::Ping,
            ClientMessageKind::BindCid,
            ClientMessageKind::RetryMessage,
            ClientMessageKind::EditorContentUpdate,
            ClientMessageKind::EditorRequestPreview,
        ];

        for kind in kinds {
            let json = serde_json::to_string(&kind).expect("serialize");
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_timestamp_stamped_at_creation() {
        let msg = ClientMessage::stop();
        let ts = msg.timestamp.expect("timestamp present");
        assert!(ts > 1_672_531_200_000);
    }
}
