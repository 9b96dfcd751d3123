//! Transport tuning options and credentials.
//!
//! [`TransportOptions`] collects every timing knob the dispatch task
//! consults; [`Credentials`] carries what the dial URL needs to
//! authenticate. Both are normally populated through
//! [`ChatClientBuilder`](crate::client::ChatClientBuilder) rather than
//! constructed directly.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use chat_transport::TransportOptions;
//!
//! let options = TransportOptions {
//!     connect_timeout: Duration::from_secs(5),
//!     ..Default::default()
//! };
//! assert!(options.validate().is_ok());
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::DeviceToken;
use crate::transport::BackoffConfig;

// ============================================================================
// TransportOptions
// ============================================================================

/// Timing and retry configuration for the chat transport.
///
/// The defaults suit a dashboard talking to a nearby backend; raise the
/// timeouts for high-latency links.
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Time allowed for the WebSocket handshake to complete.
    pub connect_timeout: Duration,

    /// Interval between outbound heartbeat pings.
    pub heartbeat_interval: Duration,

    /// Time allowed for the backend health probe after an unexpected close.
    pub probe_timeout: Duration,

    /// How long to wait for a readiness acknowledgement before assuming
    /// the session is ready. Only consulted when [`implicit_ready`] is set.
    ///
    /// [`implicit_ready`]: TransportOptions::implicit_ready
    pub ready_grace: Duration,

    /// Whether to assume readiness after [`ready_grace`] elapses without a
    /// server acknowledgement. When disabled, queued messages are held
    /// until the server acknowledges.
    ///
    /// [`ready_grace`]: TransportOptions::ready_grace
    pub implicit_ready: bool,

    /// Consecutive failed reconnect attempts tolerated before the client
    /// gives up and latches the failed state.
    pub max_reconnect_attempts: u32,

    /// Backoff schedule walked between reconnect attempts.
    pub backoff: BackoffConfig,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(3),
            ready_grace: Duration::from_millis(200),
            implicit_ready: true,
            max_reconnect_attempts: 5,
            backoff: BackoffConfig::default(),
        }
    }
}

impl TransportOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout.is_zero() {
            return Err(Error::config("connect_timeout must be greater than zero"));
        }
        if self.heartbeat_interval.is_zero() {
            return Err(Error::config(
                "heartbeat_interval must be greater than zero",
            ));
        }
        if self.probe_timeout.is_zero() {
            return Err(Error::config("probe_timeout must be greater than zero"));
        }

        let backoff = &self.backoff;
        if backoff.base_delay.is_zero() || backoff.restart_base_delay.is_zero() {
            return Err(Error::config("backoff delays must be greater than zero"));
        }
        if backoff.max_delay < backoff.base_delay || backoff.max_delay < backoff.restart_base_delay
        {
            return Err(Error::config("backoff max_delay must not undercut the base delays"));
        }
        if backoff.multiplier < 1.0 || backoff.restart_multiplier < 1.0 {
            return Err(Error::config("backoff multipliers must be at least 1.0"));
        }
        if !(0.0..=1.0).contains(&backoff.jitter_factor) {
            return Err(Error::config("jitter_factor must be within 0.0..=1.0"));
        }

        Ok(())
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// Authentication material carried in the dial URL.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Bearer token identifying the user session.
    pub token: String,

    /// Optional per-device token for online-duration accounting.
    pub device_token: Option<DeviceToken>,
}

// ============================================================================
// URL Helpers
// ============================================================================

/// Parses and canonicalizes a backend base URL.
///
/// Accepts `http`, `https`, `ws`, and `wss` schemes; the WebSocket schemes
/// are folded into their HTTP equivalents so the same base serves both the
/// chat endpoint and the health probe.
pub(crate) fn normalize_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw)
        .map_err(|err| Error::config(format!("invalid base URL {raw:?}: {err}")))?;

    let scheme = match url.scheme() {
        "http" | "https" => None,
        "ws" => Some("http"),
        "wss" => Some("https"),
        other => {
            return Err(Error::config(format!(
                "unsupported base URL scheme {other:?}; expected http(s) or ws(s)"
            )));
        }
    };
    if let Some(scheme) = scheme {
        // Infallible: both sides are special schemes.
        let _ = url.set_scheme(scheme);
    }

    if url.host_str().is_none() {
        return Err(Error::config(format!("base URL {raw:?} has no host")));
    }

    Ok(url)
}

/// Derives the WebSocket chat endpoint from a canonical base URL.
pub(crate) fn ws_endpoint(base: &Url) -> Result<Url> {
    let mut url = base.clone();
    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        _ => "ws",
    };
    let _ = url.set_scheme(scheme);

    url.path_segments_mut()
        .map_err(|()| Error::config("base URL cannot carry a path"))?
        .pop_if_empty()
        .extend(["ws", "chat"]);

    Ok(url)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(TransportOptions::default().validate().is_ok());
        assert!(TransportOptions::new().validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let options = TransportOptions {
            connect_timeout: Duration::ZERO,
            ..Default::default()
        };
        let err = options.validate().unwrap_err();
        assert!(err.to_string().contains("connect_timeout"));
    }

    #[test]
    fn test_zero_heartbeat_rejected() {
        let options = TransportOptions {
            heartbeat_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_backoff_bounds_checked() {
        let mut options = TransportOptions::default();
        options.backoff.max_delay = Duration::from_millis(1);
        assert!(options.validate().is_err());

        let mut options = TransportOptions::default();
        options.backoff.jitter_factor = 1.5;
        assert!(options.validate().is_err());

        let mut options = TransportOptions::default();
        options.backoff.multiplier = 0.5;
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_normalize_accepts_http_schemes() {
        let url = normalize_base_url("http://chat.example.com").expect("http");
        assert_eq!(url.scheme(), "http");

        let url = normalize_base_url("https://chat.example.com/api").expect("https");
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.path(), "/api");
    }

    #[test]
    fn test_normalize_folds_ws_schemes() {
        let url = normalize_base_url("ws://chat.example.com").expect("ws");
        assert_eq!(url.scheme(), "http");

        let url = normalize_base_url("wss://chat.example.com").expect("wss");
        assert_eq!(url.scheme(), "https");
    }

    #[test]
    fn test_normalize_rejects_other_schemes() {
        assert!(normalize_base_url("ftp://chat.example.com").is_err());
        assert!(normalize_base_url("not a url").is_err());
    }

    #[test]
    fn test_ws_endpoint_paths() {
        let base = normalize_base_url("http://chat.example.com").expect("base");
        let endpoint = ws_endpoint(&base).expect("endpoint");
        assert_eq!(endpoint.as_str(), "ws://chat.example.com/ws/chat");

        let base = normalize_base_url("https://chat.example.com/api/").expect("base");
        let endpoint = ws_endpoint(&base).expect("endpoint");
        assert_eq!(endpoint.as_str(), "wss://chat.example.com/api/ws/chat");
    }
}
