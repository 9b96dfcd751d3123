//! Watch connection lifecycle transitions and transport stats.
//!
//! Demonstrates:
//! - State and error callbacks
//! - Reconnect behavior on a short backoff schedule
//! - Polling transport stats
//! - Manual reconnect after the retry budget is exhausted
//!
//! Start and stop a backend at $CHAT_BASE_URL while this runs to watch the
//! transport cycle through Reconnecting / ServerRestarting / Connected.
//!
//! Usage:
//!   cargo run --example watch_state
//!   cargo run --example watch_state -- --debug
//!   cargo run --example watch_state -- --no-wait

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use chat_transport::{BackoffConfig, ChatClient, ConnectionState, Result};
use common::Args;

// ============================================================================
// Constants
// ============================================================================

const POLL_INTERVAL: Duration = Duration::from_secs(2);
const NO_WAIT_POLLS: u32 = 5;

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== Watch: lifecycle and stats ===\n");

    let base_url = common::base_url();

    // ========================================================================
    // Build Client
    // ========================================================================

    println!("[1] Building client...");
    println!("    Backend: {base_url}");

    let client = ChatClient::builder()
        .base_url(base_url)
        .token(common::token())
        .max_reconnect_attempts(10)
        .backoff(BackoffConfig {
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            ..BackoffConfig::default()
        })
        .on_state(|state| println!("    [state] -> {state}"))
        .on_error(|error| eprintln!("    [error] {error}"))
        .build()?;

    println!("    ✓ Client ready\n");

    // ========================================================================
    // Connect
    // ========================================================================

    println!("[2] Connecting...");

    match client.connect(None).await {
        Ok(()) => println!("    ✓ Connected\n"),
        Err(e) => {
            println!("    ✗ First dial failed: {e}");
            println!("    (reconnects continue in the background)\n");
        }
    }

    // ========================================================================
    // Poll Stats
    // ========================================================================

    println!("[3] Polling transport stats (Ctrl+C to stop)...");

    let mut polls = 0u32;
    loop {
        tokio::select! {
            _ = tokio::time::sleep(POLL_INTERVAL) => {
                print_snapshot(&client);
                polls += 1;
            }
            _ = tokio::signal::ctrl_c() => break,
        }

        if client.state() == ConnectionState::Failed {
            println!("    Retry budget exhausted; issuing a manual reconnect...");
            if let Err(e) = client.manual_reconnect().await {
                println!("    ✗ Manual reconnect failed: {e}");
            }
        }

        if args.no_wait && polls >= NO_WAIT_POLLS {
            println!("    [--no-wait] Stopping after {polls} polls");
            break;
        }
    }
    println!();

    // ========================================================================
    // Cleanup
    // ========================================================================

    println!("[Cleanup] Closing transport...");
    client.close().await?;
    println!("          ✓ Done");

    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

fn print_snapshot(client: &ChatClient) {
    let stats = client.stats();
    println!(
        "    state={:<16} ready={:<5} attempts={} sent={} received={} last_connected_ms={:?}",
        client.state().to_string(),
        client.is_ready(),
        client.reconnect_attempts(),
        stats.messages_sent,
        stats.messages_received,
        stats.last_connected_ms,
    );
}
