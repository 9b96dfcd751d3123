//! Shared utilities for the demo binaries.
//!
//! Provides common functionality used across all demos:
//! - Command-line argument parsing
//! - Logging initialization
//! - Backend endpoint discovery

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use tracing_subscriber::EnvFilter;

// ============================================================================
// Endpoint Helpers
// ============================================================================

/// Get the backend base URL from $CHAT_BASE_URL.
pub fn base_url() -> String {
    std::env::var("CHAT_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:8787".to_string())
}

/// Get the bearer token from $CHAT_TOKEN.
pub fn token() -> String {
    std::env::var("CHAT_TOKEN").unwrap_or_else(|_| "dev-token".to_string())
}

/// Get the conversation id from $CHAT_CID, if set.
pub fn cid() -> Option<String> {
    std::env::var("CHAT_CID").ok().filter(|c| !c.is_empty())
}

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments for demos.
#[derive(Debug, Clone)]
pub struct Args {
    pub debug: bool,
    pub no_wait: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self {
            debug: args.iter().any(|a| a == "--debug"),
            no_wait: args.iter().any(|a| a == "--no-wait"),
        }
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Initialize tracing/logging.
pub fn init_logging(debug: bool) {
    let filter = if debug {
        "chat_transport=debug"
    } else {
        "chat_transport=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

/// Mask a token for display, keeping a short prefix.
pub fn mask(token: &str) -> String {
    let prefix: String = token.chars().take(4).collect();
    format!("{prefix}****")
}
