//! Transport benchmark suite.
//!
//! Benchmarks the two hot paths of the chat transport:
//! - Backoff schedule math at several attempt depths
//! - Send round-trips against an in-process WebSocket backend
//!
//! Run with: cargo bench --bench transport
//! Results saved to: target/criterion/

use std::hint::black_box;
use std::time::Duration;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use tokio_tungstenite::tungstenite::Message;

use chat_transport::transport::{BackoffConfig, BackoffPolicy};
use chat_transport::{ChatClient, ClientMessage};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const ATTEMPT_DEPTHS: &[u32] = &[1, 3, 5, 8];
const PAYLOAD_BYTES: &[usize] = &[32, 1024, 16 * 1024];

// ============================================================================
// Local Backend - acks readiness, then drains inbound frames
// ============================================================================

async fn start_backend() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Could not bind benchmark backend");
    let addr = listener
        .local_addr()
        .expect("Could not read backend address");

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                let ready = r#"{"type":"state_update","data":{"state":"idle"}}"#;
                if ws.send(Message::Text(ready.into())).await.is_err() {
                    return;
                }
                while let Some(Ok(_)) = ws.next().await {}
            });
        }
    });

    format!("http://{addr}")
}

async fn connect_client(base_url: &str) -> ChatClient {
    let client = ChatClient::builder()
        .base_url(base_url)
        .token("bench-token")
        .heartbeat_interval(Duration::from_secs(600))
        .ready_grace(Duration::from_millis(10))
        .build()
        .expect("Could not build benchmark client");
    client
        .connect(None)
        .await
        .expect("Could not reach benchmark backend");
    while !client.is_ready() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    client
}

// ============================================================================
// Benchmark: Backoff Schedules
// ============================================================================

fn bench_backoff(c: &mut Criterion) {
    let policy = BackoffPolicy::new(BackoffConfig::default());

    let mut group = c.benchmark_group("backoff");

    for &attempt in ATTEMPT_DEPTHS {
        group.bench_with_input(
            BenchmarkId::new("standard", attempt),
            &attempt,
            |b, &attempt| {
                b.iter(|| black_box(policy.standard_delay(black_box(attempt))));
            },
        );
        group.bench_with_input(
            BenchmarkId::new("restart", attempt),
            &attempt,
            |b, &attempt| {
                b.iter(|| black_box(policy.restart_delay(black_box(attempt))));
            },
        );
    }

    group.finish();
}

// ============================================================================
// Benchmark: Send Round-Trip
// ============================================================================

fn bench_send(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let base_url = rt.block_on(start_backend());
    let client = rt.block_on(connect_client(&base_url));

    let mut group = c.benchmark_group("send");
    group.sample_size(60); // Each sample is a full enqueue-to-wire round trip
    group.measurement_time(Duration::from_secs(10));

    for &bytes in PAYLOAD_BYTES {
        let text = "x".repeat(bytes);
        group.bench_with_input(
            BenchmarkId::new("user_message", bytes),
            &text,
            |b, text| {
                b.to_async(&rt).iter(|| async {
                    client
                        .send(ClientMessage::user_message(json!({ "text": text })))
                        .await
                        .expect("send failed")
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_backoff, bench_send);
criterion_main!(benches);
