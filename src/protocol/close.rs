//! Close-code classification.
//!
//! The server encodes the reason for a disconnect in the WebSocket close
//! code. The classification here drives divergent handling in the state
//! machine: clean closes stop, terminal causes latch, everything else feeds
//! the reconnection policy.
//!
//! See ARCHITECTURE.md Section 4.1 for the cause table.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use crate::error::Error;

// ============================================================================
// CloseCause
// ============================================================================

/// Classified reason for a transport close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseCause {
    /// Clean close (1000).
    Normal,

    /// Authentication rejected (4001).
    AuthFailed,

    /// Session superseded by another connection (4002).
    SessionReplaced,

    /// Account banned (4003).
    Banned,

    /// Server configuration changed; client must reload (4004).
    ConfigChanged,

    /// Rate limited (4429).
    RateLimited,

    /// Any other close code; treated as an unexpected, retryable disconnect.
    Abnormal(u16),
}

impl CloseCause {
    /// Classifies a close code.
    #[must_use]
    pub fn from_code(code: u16) -> Self {
        match code {
            1000 => Self::Normal,
            4001 => Self::AuthFailed,
            4002 => Self::SessionReplaced,
            4003 => Self::Banned,
            4004 => Self::ConfigChanged,
            4429 => Self::RateLimited,
            other => Self::Abnormal(other),
        }
    }

    /// Returns the wire close code for this cause.
    #[inline]
    #[must_use]
    pub fn code(self) -> u16 {
        match self {
            Self::Normal => 1000,
            Self::AuthFailed => 4001,
            Self::SessionReplaced => 4002,
            Self::Banned => 4003,
            Self::ConfigChanged => 4004,
            Self::RateLimited => 4429,
            Self::Abnormal(code) => code,
        }
    }

    /// Returns `true` if this cause permits an automatic reconnect.
    ///
    /// Only unrecognized codes do; every recognized cause either ends the
    /// connection cleanly or latches a terminal state.
    #[inline]
    #[must_use]
    pub fn should_reconnect(self) -> bool {
        matches!(self, Self::Abnormal(_))
    }

    /// Returns `true` if this cause latches a terminal state.
    ///
    /// Terminal causes block automatic recovery until a manual reconnect.
    /// `Normal` and `ConfigChanged` end in `disconnected` instead and are
    /// not terminal in this sense.
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::AuthFailed | Self::SessionReplaced | Self::Banned | Self::RateLimited
        )
    }

    /// Returns the error surfaced to the error callback, if any.
    ///
    /// `Normal` and abnormal codes surface nothing here: clean closes are
    /// not errors, and abnormal closes are reported through the
    /// reconnection path instead.
    #[must_use]
    pub fn as_error(self) -> Option<Error> {
        match self {
            Self::Normal | Self::Abnormal(_) => None,
            Self::AuthFailed => Some(Error::AuthFailed),
            Self::SessionReplaced => Some(Error::Kicked),
            Self::Banned => Some(Error::Banned),
            Self::ConfigChanged => Some(Error::ConfigChanged),
            Self::RateLimited => Some(Error::RateLimited),
        }
    }
}

impl fmt::Display for CloseCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "normal close"),
            Self::AuthFailed => write!(f, "auth failed"),
            Self::SessionReplaced => write!(f, "session replaced"),
            Self::Banned => write!(f, "account banned"),
            Self::ConfigChanged => write!(f, "config changed"),
            Self::RateLimited => write!(f, "rate limited"),
            Self::Abnormal(code) => write!(f, "abnormal close (code {code})"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
