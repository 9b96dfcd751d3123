//! Chat connection dispatch task.
//!
//! A single spawned task owns the WebSocket for its entire life: it dials,
//! reads frames, writes queued messages, probes the backend after an
//! unexpected close, and walks the reconnect schedule. Callers never touch
//! the socket; every verb on [`ChatClient`](crate::client::ChatClient) is a
//! [`Command`] sent over an mpsc channel and acknowledged through a oneshot
//! once the task has acted on it.
//!
//! See ARCHITECTURE.md Section 3 for the lifecycle specification.
//!
//! # States
//!
//! | State | Meaning |
//! |-------|---------|
//! | `Disconnected` | No transport, nothing scheduled |
//! | `Connecting` | User-initiated dial in flight |
//! | `Connected` | Transport open (readiness is tracked separately) |
//! | `Reconnecting` | Unexpected close, backend reachable, standard backoff |
//! | `ServerRestarting` | Unexpected close, backend unreachable, gentler backoff |
//! | `Kicked` | Session replaced by another connection |
//! | `Failed` | Terminal failure, waiting for a manual reconnect |
//!
//! Readiness is a sub-state of `Connected`: the transport is open as soon as
//! the dial completes, but queued messages are only released once the server
//! acknowledges the session (or the implicit-ready grace period elapses).

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, interval_at, sleep_until, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::client::{Credentials, TransportOptions, ws_endpoint};
use crate::error::{Error, Result};
use crate::identifiers::ConversationId;
use crate::protocol::{ClientMessage, CloseCause, ControlEvent, ServerEvent, now_ms};
use crate::transport::backoff::BackoffPolicy;
use crate::transport::health::HealthProber;
use crate::transport::queue::{OutboundQueue, PendingMessage};

// ============================================================================
// Constants
// ============================================================================

/// Deadline used to park the ready-grace timer when implicit ready is off.
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365);

// ============================================================================
// Connection State
// ============================================================================

/// Lifecycle state of the chat connection.
///
/// Exactly one state holds at any time. The dispatch task is the only
/// writer; handles observe it through an atomic mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectionState {
    /// No transport and nothing scheduled.
    Disconnected = 0,

    /// A user-initiated dial is in flight.
    Connecting = 1,

    /// The transport is open.
    Connected = 2,

    /// Retrying after an unexpected close; the backend answered its
    /// health probe.
    Reconnecting = 3,

    /// Retrying after an unexpected close; the backend did not answer
    /// its health probe.
    ServerRestarting = 4,

    /// Another connection took over this session.
    Kicked = 5,

    /// Terminal failure. Only a manual reconnect leaves this state.
    Failed = 6,
}

impl ConnectionState {
    /// Decodes the atomic mirror written by the dispatch task.
    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Connecting,
            2 => Self::Connected,
            3 => Self::Reconnecting,
            4 => Self::ServerRestarting,
            5 => Self::Kicked,
            6 => Self::Failed,
            _ => Self::Disconnected,
        }
    }

    #[inline]
    pub(crate) fn as_u8(self) -> u8 {
        self as u8
    }

    /// Returns `true` for states that only a manual reconnect can leave.
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Kicked | Self::Failed)
    }

    /// Returns `true` while the transport is open.
    #[inline]
    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns `true` for states in which outbound messages are buffered
    /// rather than rejected.
    #[inline]
    #[must_use]
    pub fn can_enqueue(self) -> bool {
        matches!(
            self,
            Self::Connecting | Self::Connected | Self::Reconnecting | Self::ServerRestarting
        )
    }

    /// Stable lowercase name, suitable for logs and dashboards.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::ServerRestarting => "server_restarting",
            Self::Kicked => "kicked",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Transport Statistics
// ============================================================================

/// Cumulative transport counters.
///
/// Updated by the dispatch task, read by handles via [`snapshot`].
///
/// [`snapshot`]: TransportStats::snapshot
#[derive(Debug, Default)]
pub struct TransportStats {
    messages_sent: AtomicU64,
    messages_received: AtomicU64,
    reconnect_attempts: AtomicU64,
    last_connected_ms: AtomicU64,
}

impl TransportStats {
    fn record_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    fn record_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    fn record_reconnect_attempt(&self) {
        self.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    fn record_connected(&self, at_ms: u64) {
        self.last_connected_ms.store(at_ms, Ordering::Relaxed);
    }

    /// Takes a point-in-time copy of all counters.
    #[must_use]
    pub fn snapshot(&self) -> TransportStatsSnapshot {
        let last = self.last_connected_ms.load(Ordering::Relaxed);
        TransportStatsSnapshot {
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            reconnect_attempts: self.reconnect_attempts.load(Ordering::Relaxed),
            last_connected_ms: (last > 0).then_some(last),
        }
    }
}

/// Point-in-time copy of [`TransportStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportStatsSnapshot {
    /// Frames written to the wire, heartbeats included.
    pub messages_sent: u64,

    /// Well-formed frames read from the wire, control events included.
    pub messages_received: u64,

    /// Reconnect attempts scheduled over the life of the client.
    pub reconnect_attempts: u64,

    /// Epoch milliseconds of the most recent successful open.
    pub last_connected_ms: Option<u64>,
}

// ============================================================================
// Callbacks
// ============================================================================

/// Callback invoked for every data event received from the server.
pub type EventCallback = Box<dyn Fn(ServerEvent) + Send + Sync>;

/// Callback invoked on every connection state change.
pub type StateCallback = Box<dyn Fn(ConnectionState) + Send + Sync>;

/// Callback invoked when an error is surfaced to the consumer.
pub type ErrorCallback = Box<dyn Fn(Error) + Send + Sync>;

/// Consumer callbacks, registered on the builder and owned by the
/// dispatch task.
#[derive(Default)]
pub(crate) struct TransportCallbacks {
    pub(crate) on_event: Option<EventCallback>,
    pub(crate) on_state: Option<StateCallback>,
    pub(crate) on_error: Option<ErrorCallback>,
}

// ============================================================================
// Commands
// ============================================================================

type Ack = oneshot::Sender<Result<()>>;

/// Commands sent from handles to the dispatch task.
pub(crate) enum Command {
    /// Open the transport, optionally switching the bound conversation.
    Connect {
        cid: Option<ConversationId>,
        ack: Ack,
    },

    /// Rebind the session to another conversation without reopening.
    BindCid { cid: ConversationId, ack: Ack },

    /// Transmit a message, or buffer it until the session is ready.
    Send { message: ClientMessage, ack: Ack },

    /// Deliberately close the transport and cancel any scheduled retry.
    Close { ack: Ack },

    /// Close and additionally forget the bound conversation and counters.
    Reset { ack: Ack },

    /// Leave any terminal state and dial immediately, skipping backoff.
    ManualReconnect { ack: Ack },

    /// Terminate the dispatch task. Sent on drop of the last handle.
    Shutdown,
}

// ============================================================================
// Shared State
// ============================================================================

/// State mirrored out of the dispatch task for lock-free reads by handles.
pub(crate) struct SharedState {
    state: AtomicU8,
    ready: AtomicBool,
    attempts: AtomicU32,
    cid: Mutex<Option<ConversationId>>,
    stats: TransportStats,
}

impl SharedState {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(ConnectionState::Disconnected.as_u8()),
            ready: AtomicBool::new(false),
            attempts: AtomicU32::new(0),
            cid: Mutex::new(None),
            stats: TransportStats::default(),
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn cid(&self) -> Option<ConversationId> {
        self.cid.lock().clone()
    }

    pub(crate) fn stats(&self) -> &TransportStats {
        &self.stats
    }
}

// ============================================================================
// Spawning
// ============================================================================

/// Spawns the dispatch task and returns its command channel and the shared
/// state mirror.
pub(crate) fn spawn_connection(
    base_url: &Url,
    options: TransportOptions,
    credentials: Credentials,
    callbacks: TransportCallbacks,
    shutdown: CancellationToken,
) -> Result<(mpsc::UnboundedSender<Command>, Arc<SharedState>)> {
    let endpoint = ws_endpoint(base_url)?;
    let prober = HealthProber::new(base_url, options.probe_timeout)?;
    let policy = BackoffPolicy::new(options.backoff.clone());
    let shared = Arc::new(SharedState::new());
    let (command_tx, command_rx) = mpsc::unbounded_channel();

    let task = ConnectionTask {
        endpoint,
        options,
        credentials,
        policy,
        prober,
        callbacks,
        shared: Arc::clone(&shared),
        shutdown,
        queue: OutboundQueue::new(),
        cid: None,
        wire_cid: None,
        errored: false,
    };
    tokio::spawn(task.run(command_rx));

    Ok((command_tx, shared))
}

// ============================================================================
// Dispatch Task
// ============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Phase of the dispatch loop. Exactly one phase runs at a time; each phase
/// owns its own timers and hands control to the next.
enum Phase {
    /// Waiting for a command. Covers disconnected and both terminal states.
    Idle,

    /// A dial is in flight. `pending` is acknowledged when it resolves.
    Dial { pending: Option<Ack> },

    /// The transport is open.
    Open { ws: Box<WsStream> },

    /// Waiting out a backoff delay before redialing.
    Backoff { deadline: Instant },

    /// Terminate the task.
    Exit,
}

struct ConnectionTask {
    endpoint: Url,
    options: TransportOptions,
    credentials: Credentials,
    policy: BackoffPolicy,
    prober: HealthProber,
    callbacks: TransportCallbacks,
    shared: Arc<SharedState>,
    shutdown: CancellationToken,
    queue: OutboundQueue,
    /// Conversation the consumer wants bound, mirrored into `shared`.
    cid: Option<ConversationId>,
    /// Conversation the server currently has bound for this transport.
    wire_cid: Option<ConversationId>,
    /// One-shot guard: suppresses the duplicate notification when a
    /// transport error is followed by its own close.
    errored: bool,
}

impl ConnectionTask {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        debug!("chat dispatch task started");
        let mut phase = Phase::Idle;
        loop {
            phase = match phase {
                Phase::Idle => self.run_idle(&mut rx).await,
                Phase::Dial { pending } => self.run_dial(&mut rx, pending).await,
                Phase::Open { ws } => self.run_open(&mut rx, *ws).await,
                Phase::Backoff { deadline } => self.run_backoff(&mut rx, deadline).await,
                Phase::Exit => break,
            };
        }
        self.queue.reject_all();
        debug!("chat dispatch task terminated");
    }

    // ------------------------------------------------------------------
    // Phase: idle
    // ------------------------------------------------------------------

    async fn run_idle(&mut self, rx: &mut mpsc::UnboundedReceiver<Command>) -> Phase {
        let shutdown = self.shutdown.clone();
        loop {
            tokio::select! {
                cmd = rx.recv() => match cmd {
                    Some(Command::Connect { cid, ack }) => {
                        if cid.is_some() {
                            self.set_cid(cid);
                        }
                        self.errored = false;
                        self.set_state(ConnectionState::Connecting);
                        return Phase::Dial { pending: Some(ack) };
                    }
                    Some(Command::BindCid { cid, ack }) => {
                        // No transport to rebind; remember the target for
                        // the next dial.
                        self.set_cid(Some(cid));
                        let _ = ack.send(Ok(()));
                    }
                    Some(Command::Send { ack, .. }) => {
                        let _ = ack.send(Err(Error::NotConnected));
                    }
                    Some(Command::Close { ack }) => {
                        self.set_state(ConnectionState::Disconnected);
                        let _ = ack.send(Ok(()));
                    }
                    Some(Command::Reset { ack }) => {
                        self.clear_identity();
                        self.set_state(ConnectionState::Disconnected);
                        let _ = ack.send(Ok(()));
                    }
                    Some(Command::ManualReconnect { ack }) => {
                        self.reset_retry_state();
                        self.set_state(ConnectionState::Connecting);
                        return Phase::Dial { pending: Some(ack) };
                    }
                    Some(Command::Shutdown) | None => return Phase::Exit,
                },
                _ = shutdown.cancelled() => return Phase::Exit,
            }
        }
    }

    // ------------------------------------------------------------------
    // Phase: dial
    // ------------------------------------------------------------------

    async fn run_dial(
        &mut self,
        rx: &mut mpsc::UnboundedReceiver<Command>,
        mut pending: Option<Ack>,
    ) -> Phase {
        let url = self.dial_url();
        self.wire_cid = self.cid.clone();
        debug!(
            host = self.endpoint.host_str().unwrap_or_default(),
            cid = ?self.cid,
            "dialing chat endpoint"
        );

        let shutdown = self.shutdown.clone();
        let connect = timeout(self.options.connect_timeout, connect_async(url.as_str()));
        tokio::pin!(connect);

        loop {
            tokio::select! {
                outcome = &mut connect => {
                    return match outcome {
                        Ok(Ok((ws, _response))) => {
                            self.on_open(pending.take());
                            Phase::Open { ws: Box::new(ws) }
                        }
                        Ok(Err(err)) => {
                            warn!(error = %err, "chat transport open failed");
                            if let Some(ack) = pending.take() {
                                let _ = ack.send(Err(Error::WebSocket(err)));
                            }
                            self.begin_retry().await
                        }
                        Err(_) => {
                            let timeout_ms = self.options.connect_timeout.as_millis() as u64;
                            warn!(timeout_ms, "chat transport open timed out");
                            if let Some(ack) = pending.take() {
                                let _ = ack.send(Err(Error::connection_timeout(timeout_ms)));
                            }
                            self.begin_retry().await
                        }
                    };
                }
                cmd = rx.recv() => match cmd {
                    Some(Command::Connect { ack, .. }) => {
                        // A dial is already in flight.
                        let _ = ack.send(Ok(()));
                    }
                    Some(Command::BindCid { cid, ack }) => {
                        self.set_cid(Some(cid));
                        let _ = ack.send(Ok(()));
                    }
                    Some(Command::Send { message, ack }) => {
                        self.queue.push(PendingMessage::new(message, ack));
                    }
                    Some(Command::Close { ack }) => {
                        self.abort_attempt(pending.take());
                        let _ = ack.send(Ok(()));
                        return Phase::Idle;
                    }
                    Some(Command::Reset { ack }) => {
                        self.abort_attempt(pending.take());
                        self.clear_identity();
                        let _ = ack.send(Ok(()));
                        return Phase::Idle;
                    }
                    Some(Command::ManualReconnect { ack }) => {
                        self.reset_retry_state();
                        let _ = ack.send(Ok(()));
                    }
                    Some(Command::Shutdown) | None => {
                        self.abort_attempt(pending.take());
                        return Phase::Exit;
                    }
                },
                _ = shutdown.cancelled() => {
                    self.abort_attempt(pending.take());
                    return Phase::Exit;
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Phase: open
    // ------------------------------------------------------------------

    async fn run_open(
        &mut self,
        rx: &mut mpsc::UnboundedReceiver<Command>,
        mut ws: WsStream,
    ) -> Phase {
        // The desired conversation may have moved while the dial was in
        // flight; align the server before anything else goes out.
        if let Some(cid) = self.cid.clone() {
            if self.wire_cid.as_ref() != Some(&cid) {
                if let Err(err) = self.transmit(&mut ws, &ClientMessage::bind_cid(&cid)).await {
                    return self.transport_error(&mut ws, err).await;
                }
                self.wire_cid = Some(cid);
            }
        }

        let shutdown = self.shutdown.clone();
        let mut heartbeat = interval_at(
            Instant::now() + self.options.heartbeat_interval,
            self.options.heartbeat_interval,
        );
        let ready_at = if self.options.implicit_ready {
            Instant::now() + self.options.ready_grace
        } else {
            Instant::now() + FAR_FUTURE
        };
        let ready_grace = sleep_until(ready_at);
        tokio::pin!(ready_grace);

        loop {
            tokio::select! {
                frame = ws.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(next) = self.handle_text(&mut ws, text.as_str()).await {
                            return next;
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        let _ = ws.send(Message::Pong(payload)).await;
                    }
                    Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Close(frame))) => {
                        let cause = frame.map_or(CloseCause::Abnormal(1005), |f| {
                            CloseCause::from_code(u16::from(f.code))
                        });
                        return self.handle_close(&mut ws, cause).await;
                    }
                    Some(Ok(_)) => {
                        trace!("ignoring non-text frame");
                    }
                    Some(Err(err)) => {
                        return self.transport_error(&mut ws, Error::WebSocket(err)).await;
                    }
                    None => {
                        // Stream ended without a close frame.
                        return self.handle_close(&mut ws, CloseCause::Abnormal(1006)).await;
                    }
                },
                cmd = rx.recv() => match cmd {
                    Some(Command::Connect { cid, ack }) => match cid {
                        Some(cid) if self.wire_cid.as_ref() != Some(&cid) => {
                            // Open transport, different conversation:
                            // rebind in place instead of reopening.
                            match self.rebind(&mut ws, cid).await {
                                Ok(()) => {
                                    let _ = ack.send(Ok(()));
                                }
                                Err(err) => {
                                    let _ = ack.send(Err(Error::ConnectionClosed));
                                    return self.transport_error(&mut ws, err).await;
                                }
                            }
                        }
                        _ => {
                            let _ = ack.send(Ok(()));
                        }
                    },
                    Some(Command::BindCid { cid, ack }) => {
                        if self.wire_cid.as_ref() == Some(&cid) {
                            let _ = ack.send(Ok(()));
                        } else {
                            match self.rebind(&mut ws, cid).await {
                                Ok(()) => {
                                    let _ = ack.send(Ok(()));
                                }
                                Err(err) => {
                                    let _ = ack.send(Err(Error::ConnectionClosed));
                                    return self.transport_error(&mut ws, err).await;
                                }
                            }
                        }
                    }
                    Some(Command::Send { message, ack }) => {
                        if self.shared.is_ready() {
                            match self.transmit(&mut ws, &message).await {
                                Ok(()) => {
                                    let _ = ack.send(Ok(()));
                                }
                                Err(err) => {
                                    let _ = ack.send(Err(Error::ConnectionClosed));
                                    return self.transport_error(&mut ws, err).await;
                                }
                            }
                        } else {
                            self.queue.push(PendingMessage::new(message, ack));
                        }
                    }
                    Some(Command::Close { ack }) => {
                        self.shutdown_transport(&mut ws).await;
                        let _ = ack.send(Ok(()));
                        return Phase::Idle;
                    }
                    Some(Command::Reset { ack }) => {
                        self.shutdown_transport(&mut ws).await;
                        self.clear_identity();
                        let _ = ack.send(Ok(()));
                        return Phase::Idle;
                    }
                    Some(Command::ManualReconnect { ack }) => {
                        let _ = ws.close(None).await;
                        self.shared.ready.store(false, Ordering::SeqCst);
                        self.reset_retry_state();
                        self.set_state(ConnectionState::Connecting);
                        return Phase::Dial { pending: Some(ack) };
                    }
                    Some(Command::Shutdown) | None => {
                        self.shutdown_transport(&mut ws).await;
                        return Phase::Exit;
                    }
                },
                _ = heartbeat.tick() => {
                    // Heartbeats flow as long as the transport is open,
                    // readiness notwithstanding.
                    if let Err(err) = self.transmit(&mut ws, &ClientMessage::ping()).await {
                        return self.transport_error(&mut ws, err).await;
                    }
                }
                _ = &mut ready_grace, if !self.shared.is_ready() => {
                    debug!(
                        grace_ms = self.options.ready_grace.as_millis() as u64,
                        "no readiness ack, assuming ready"
                    );
                    if let Err(err) = self.mark_ready(&mut ws).await {
                        return self.transport_error(&mut ws, err).await;
                    }
                }
                _ = shutdown.cancelled() => {
                    self.shutdown_transport(&mut ws).await;
                    return Phase::Exit;
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Phase: backoff
    // ------------------------------------------------------------------

    async fn run_backoff(
        &mut self,
        rx: &mut mpsc::UnboundedReceiver<Command>,
        deadline: Instant,
    ) -> Phase {
        let shutdown = self.shutdown.clone();
        let retry = sleep_until(deadline);
        tokio::pin!(retry);

        loop {
            tokio::select! {
                _ = &mut retry => {
                    return Phase::Dial { pending: None };
                }
                cmd = rx.recv() => match cmd {
                    Some(Command::Connect { ack, .. }) => {
                        // A reconnect is already scheduled.
                        let _ = ack.send(Ok(()));
                    }
                    Some(Command::BindCid { cid, ack }) => {
                        self.set_cid(Some(cid));
                        let _ = ack.send(Ok(()));
                    }
                    Some(Command::Send { message, ack }) => {
                        self.queue.push(PendingMessage::new(message, ack));
                    }
                    Some(Command::Close { ack }) => {
                        self.cancel_retry();
                        let _ = ack.send(Ok(()));
                        return Phase::Idle;
                    }
                    Some(Command::Reset { ack }) => {
                        self.cancel_retry();
                        self.clear_identity();
                        let _ = ack.send(Ok(()));
                        return Phase::Idle;
                    }
                    Some(Command::ManualReconnect { ack }) => {
                        // Skip the remaining delay and dial now.
                        self.reset_retry_state();
                        self.set_state(ConnectionState::Connecting);
                        return Phase::Dial { pending: Some(ack) };
                    }
                    Some(Command::Shutdown) | None => {
                        self.queue.reject_all();
                        return Phase::Exit;
                    }
                },
                _ = shutdown.cancelled() => {
                    self.queue.reject_all();
                    return Phase::Exit;
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Open-transport helpers
    // ------------------------------------------------------------------

    /// Routes one text frame: control events are handled internally, data
    /// events are forwarded to the consumer. Returns the next phase when the
    /// frame ends the open state.
    async fn handle_text(&mut self, ws: &mut WsStream, raw: &str) -> Option<Phase> {
        let event = match ServerEvent::parse(raw) {
            Ok(event) => event,
            Err(err) => {
                warn!(error = %err, "discarding malformed frame");
                return None;
            }
        };
        self.shared.stats.record_received();

        match event.control() {
            Some(ControlEvent::Ready) => {
                trace!(kind = %event.kind, "readiness acknowledged");
                if let Err(err) = self.mark_ready(ws).await {
                    return Some(self.transport_error(ws, err).await);
                }
                None
            }
            Some(
                ctrl @ (ControlEvent::SessionReplaced
                | ControlEvent::SessionExpired
                | ControlEvent::ForceLogout
                | ControlEvent::RateLimited),
            ) => {
                info!(kind = %event.kind, "server ended session");
                let cause = match ctrl {
                    ControlEvent::SessionReplaced => CloseCause::SessionReplaced,
                    ControlEvent::RateLimited => CloseCause::RateLimited,
                    _ => CloseCause::AuthFailed,
                };
                Some(self.handle_close(ws, cause).await)
            }
            None => {
                trace!(kind = %event.kind, "event received");
                if let Some(cb) = &self.callbacks.on_event {
                    cb(event);
                }
                None
            }
        }
    }

    /// Acts on a close verdict, whether it arrived as a close frame or as a
    /// terminal control event.
    async fn handle_close(&mut self, ws: &mut WsStream, cause: CloseCause) -> Phase {
        self.shared.ready.store(false, Ordering::SeqCst);

        if cause.should_reconnect() {
            warn!(code = cause.code(), "transport closed unexpectedly");
            return self.begin_retry().await;
        }

        info!(code = cause.code(), cause = %cause, "server closed transport");
        let _ = ws.close(None).await;
        self.queue.reject_all();
        if let Some(err) = cause.as_error() {
            self.notify_error(err);
        }
        self.set_state(match cause {
            CloseCause::SessionReplaced => ConnectionState::Kicked,
            CloseCause::AuthFailed | CloseCause::Banned | CloseCause::RateLimited => {
                ConnectionState::Failed
            }
            _ => ConnectionState::Disconnected,
        });
        Phase::Idle
    }

    /// Surfaces a transport-level error (once per epoch) and enters the
    /// retry cycle.
    async fn transport_error(&mut self, ws: &mut WsStream, err: Error) -> Phase {
        if self.errored {
            debug!(error = %err, "suppressing duplicate transport error");
        } else {
            warn!(error = %err, "chat transport error");
            self.errored = true;
            self.notify_error(err);
        }
        let _ = ws.close(None).await;
        self.shared.ready.store(false, Ordering::SeqCst);
        self.begin_retry().await
    }

    /// Increments the attempt counter and either schedules the next dial or
    /// latches `Failed` when the budget is spent. The outbound queue
    /// survives the cycle; it is only rejected at the ceiling.
    async fn begin_retry(&mut self) -> Phase {
        self.shared.ready.store(false, Ordering::SeqCst);
        let attempt = self.shared.attempts.fetch_add(1, Ordering::SeqCst) + 1;

        if attempt > self.options.max_reconnect_attempts {
            warn!(attempts = attempt - 1, "reconnect budget exhausted");
            self.queue.reject_all();
            self.notify_error(Error::reconnect_exhausted(attempt - 1));
            self.set_state(ConnectionState::Failed);
            return Phase::Idle;
        }

        self.shared.stats.record_reconnect_attempt();
        let healthy = self.prober.probe().await;
        let delay = self.policy.delay_for(attempt, healthy);
        self.set_state(if healthy {
            ConnectionState::Reconnecting
        } else {
            ConnectionState::ServerRestarting
        });
        info!(
            attempt,
            healthy,
            delay_ms = delay.as_millis() as u64,
            "scheduling reconnect"
        );
        Phase::Backoff {
            deadline: Instant::now() + delay,
        }
    }

    /// Sends a bind frame and treats the session as ready, releasing the
    /// queue: the server accepts messages for a freshly bound conversation
    /// without a new readiness ack.
    async fn rebind(&mut self, ws: &mut WsStream, cid: ConversationId) -> Result<()> {
        self.transmit(ws, &ClientMessage::bind_cid(&cid)).await?;
        info!(cid = %cid, "conversation rebound");
        self.wire_cid = Some(cid.clone());
        self.set_cid(Some(cid));
        self.mark_ready(ws).await
    }

    /// Marks the session ready exactly once and flushes the queue. A late
    /// readiness ack after the grace period already fired is a no-op.
    async fn mark_ready(&mut self, ws: &mut WsStream) -> Result<()> {
        if self.shared.ready.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        debug!(queued = self.queue.len(), "session ready");
        self.flush_queue(ws).await
    }

    /// Drains the queue in FIFO order. On a write failure the entry that
    /// failed is rejected and the rest stay queued for the next epoch.
    async fn flush_queue(&mut self, ws: &mut WsStream) -> Result<()> {
        while let Some(entry) = self.queue.pop() {
            match self.transmit(ws, &entry.message).await {
                Ok(()) => {
                    let _ = entry.ack.send(Ok(()));
                }
                Err(err) => {
                    entry.reject();
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    async fn transmit(&mut self, ws: &mut WsStream, message: &ClientMessage) -> Result<()> {
        let wire = message.to_wire()?;
        ws.send(Message::Text(wire.into())).await?;
        self.shared.stats.record_sent();
        trace!(kind = %message.kind, "frame sent");
        Ok(())
    }

    /// Deliberate local teardown: close frame out, queue rejected, state
    /// back to disconnected.
    async fn shutdown_transport(&mut self, ws: &mut WsStream) {
        let _ = ws.close(None).await;
        self.shared.ready.store(false, Ordering::SeqCst);
        self.queue.reject_all();
        self.set_state(ConnectionState::Disconnected);
    }

    // ------------------------------------------------------------------
    // Bookkeeping
    // ------------------------------------------------------------------

    fn on_open(&mut self, pending: Option<Ack>) {
        self.shared.attempts.store(0, Ordering::SeqCst);
        self.errored = false;
        self.shared.ready.store(false, Ordering::SeqCst);
        self.shared.stats.record_connected(now_ms());
        self.set_state(ConnectionState::Connected);
        if let Some(ack) = pending {
            let _ = ack.send(Ok(()));
        }
        info!(cid = ?self.cid, "chat transport open");
    }

    /// Tears down an aborted dial: the caller that initiated it learns the
    /// connection was closed underneath it.
    fn abort_attempt(&mut self, pending: Option<Ack>) {
        if let Some(ack) = pending {
            let _ = ack.send(Err(Error::ConnectionClosed));
        }
        self.queue.reject_all();
        self.set_state(ConnectionState::Disconnected);
    }

    fn cancel_retry(&mut self) {
        debug!("scheduled reconnect cancelled");
        self.queue.reject_all();
        self.set_state(ConnectionState::Disconnected);
    }

    fn reset_retry_state(&mut self) {
        self.shared.attempts.store(0, Ordering::SeqCst);
        self.errored = false;
    }

    fn clear_identity(&mut self) {
        self.set_cid(None);
        self.wire_cid = None;
        self.reset_retry_state();
    }

    fn set_cid(&mut self, cid: Option<ConversationId>) {
        *self.shared.cid.lock() = cid.clone();
        self.cid = cid;
    }

    fn set_state(&self, next: ConnectionState) {
        let prev = ConnectionState::from_u8(self.shared.state.swap(next.as_u8(), Ordering::SeqCst));
        if prev == next {
            return;
        }
        debug!(from = %prev, to = %next, "connection state changed");
        if let Some(cb) = &self.callbacks.on_state {
            cb(next);
        }
    }

    fn notify_error(&self, err: Error) {
        if let Some(cb) = &self.callbacks.on_error {
            cb(err);
        }
    }

    fn dial_url(&self) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("token", &self.credentials.token);
            if let Some(cid) = &self.cid {
                query.append_pair("cid", cid.as_str());
            }
            if let Some(device) = &self.credentials.device_token {
                query.append_pair("device-token", device.as_str());
            }
        }
        url
    }
}

// ============================================================================
// Tests
// ============================================================================
