//! Connect, send a message, and stream server events.
//!
//! Demonstrates:
//! - Building a ChatClient with callbacks
//! - Connecting and waiting for session readiness
//! - Sending a user message
//! - Streaming data events until Ctrl+C
//!
//! The backend is taken from $CHAT_BASE_URL (default http://127.0.0.1:8787),
//! the bearer token from $CHAT_TOKEN, and the conversation id from $CHAT_CID.
//!
//! Usage:
//!   cargo run --example chat
//!   cargo run --example chat -- --debug
//!   cargo run --example chat -- --no-wait

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use chat_transport::{ChatClient, ClientMessage, ConversationId, Error, Result, ServerEvent};
use common::Args;
use serde_json::json;
use tokio::sync::mpsc;

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
    println!("=== Chat: send and stream ===\n");

    let base_url = common::base_url();
    let token = common::token();

    // ========================================================================
    // Build Client
    // ========================================================================

    println!("[1] Building client...");
    println!("    Backend: {base_url}");
    println!("    Token:   {}", common::mask(&token));

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ServerEvent>();

    let client = ChatClient::builder()
        .base_url(base_url)
        .token(token)
        .on_event(move |event| {
            let _ = event_tx.send(event);
        })
        .on_state(|state| println!("    [state] {state}"))
        .on_error(|error| eprintln!("    [error] {error}"))
        .build()?;

    println!("    ✓ Client ready\n");

    // ========================================================================
    // Connect
    // ========================================================================

    println!("[2] Connecting...");

    let cid = common::cid().map(ConversationId::from);
    if let Some(cid) = &cid {
        println!("    Conversation: {cid}");
    }

    client.connect(cid).await?;
    wait_until_ready(&client).await?;

    println!("    ✓ Session ready\n");

    // ========================================================================
    // Send
    // ========================================================================

    println!("[3] Sending message...");

    let message = ClientMessage::user_message(json!({
        "text": "Hello from the chat demo",
    }));
    client.send(message).await?;

    println!("    ✓ Delivered to the wire\n");

    // ========================================================================
    // Stream Events
    // ========================================================================

    println!("[4] Streaming events...");

    if args.no_wait {
        match tokio::time::timeout(Duration::from_secs(10), event_rx.recv()).await {
            Ok(Some(event)) => print_event(&event),
            Ok(None) => println!("    (event channel closed)"),
            Err(_) => println!("    (no events within 10s)"),
        }
    } else {
        loop {
            tokio::select! {
                maybe = event_rx.recv() => {
                    let Some(event) = maybe else { break };
                    print_event(&event);
                }
                _ = tokio::signal::ctrl_c() => {
                    println!("    (interrupted)");
                    break;
                }
            }
        }
    }
    println!();

    // ========================================================================
    // Cleanup
    // ========================================================================

    println!("[Cleanup] Closing transport...");
    client.close().await?;

    let stats = client.stats();
    println!("          ✓ Closed");
    println!(
        "          Sent: {} frame(s), received: {} frame(s), reconnects: {}",
        stats.messages_sent, stats.messages_received, stats.reconnect_attempts
    );

    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

async fn wait_until_ready(client: &ChatClient) -> Result<()> {
    for _ in 0..100 {
        if client.is_ready() {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    Err(Error::timeout("session readiness", 5_000))
}

fn print_event(event: &ServerEvent) {
    let payload = event
        .data
        .as_ref()
        .map(|data| data.to_string())
        .unwrap_or_default();
    println!("    [{:>14}] {payload}", event.kind);
}
