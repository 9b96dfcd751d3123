//! Type-safe identifiers for the chat transport.
//!
//! Newtype wrappers prevent mixing incompatible identifiers at compile time:
//! a [`ConversationId`] can never be passed where a [`DeviceToken`] is
//! expected, even though both are strings on the wire.
//!
//! Both types serialize transparently as plain JSON strings.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// ConversationId
// ============================================================================

/// Identifier of the logical conversation (session) a connection is bound to.
///
/// Assigned by the backend; distinct from the transport connection itself.
/// A connection may be established unbound and rebound later without
/// reopening the transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Creates a conversation id from a string.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ConversationId {
    #[inline]
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ConversationId {
    #[inline]
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

// ============================================================================
// DeviceToken
// ============================================================================

/// Opaque per-device token used for online-duration accounting.
///
/// Optional; passed as a query parameter when the transport is opened.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceToken(String);

impl DeviceToken {
    /// Creates a device token from a string.
    #[inline]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for DeviceToken {
    #[inline]
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for DeviceToken {
    #[inline]
    fn from(token: &str) -> Self {
        Self(token.to_owned())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_id_roundtrip() {
        let cid = ConversationId::new("conv-42");
        assert_eq!(cid.as_str(), "conv-42");
        assert_eq!(cid.to_string(), "conv-42");

        let json = serde_json::to_string(&cid).unwrap();
        assert_eq!(json, "\"conv-42\"");

        let parsed: ConversationId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, cid);
    }

    #[test]
    fn test_conversation_id_from_str() {
        let a: ConversationId = "conv-1".into();
        let b = ConversationId::from("conv-1".to_string());
        assert_eq!(a, b);
    }

    #[test]
    fn test_device_token_transparent_serde() {
        let token = DeviceToken::new("dev-abc");
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(json, "\"dev-abc\"");
    }

    #[test]
    fn test_ids_are_distinct_types() {
        fn takes_cid(_: &ConversationId) {}
        takes_cid(&ConversationId::new("x"));
        // DeviceToken does not coerce into ConversationId; enforced at compile time.
    }
}
