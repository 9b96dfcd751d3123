//! Backend health probing.
//!
//! Before each reconnection attempt the transport asks `GET {base}/health`
//! whether the backend is up. The answer selects the delay curve: a live
//! backend means the disconnect was a network blip (standard backoff), a
//! dead one means the server is restarting (gentler curve, longer waits).
//!
//! The probe never fails: any network error, non-2xx status, or timeout is
//! simply "unhealthy."

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// HealthProber
// ============================================================================

/// Issues short-timeout liveness probes against the backend.
#[derive(Debug, Clone)]
pub struct HealthProber {
    client: Client,
    health_url: Url,
}

impl HealthProber {
    /// Creates a prober for the given base URL.
    ///
    /// The timeout applies to the whole request; an elapsed timeout counts
    /// as unhealthy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the HTTP client cannot be constructed
    /// or the base URL cannot carry a path.
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self> {
        let mut health_url = base_url.clone();
        health_url
            .path_segments_mut()
            .map_err(|()| Error::config(format!("base URL cannot carry a path: {base_url}")))?
            .pop_if_empty()
            .push("health");

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("failed to build health client: {e}")))?;

        Ok(Self { client, health_url })
    }

    /// Probes the backend once.
    ///
    /// Returns `true` only for a 2xx response within the timeout. Never
    /// returns an error; all failure modes are `false`.
    pub async fn probe(&self) -> bool {
        match self.client.get(self.health_url.clone()).send().await {
            Ok(response) => {
                let healthy = response.status().is_success();
                if !healthy {
                    debug!(status = %response.status(), "health probe returned non-success");
                }
                healthy
            }
            Err(e) => {
                debug!(error = %e, "health probe failed");
                false
            }
        }
    }

    /// Returns the URL this prober targets.
    #[inline]
    #[must_use]
    pub fn health_url(&self) -> &Url {
        &self.health_url
    }
}

// ============================================================================
// Tests
// ============================================================================
