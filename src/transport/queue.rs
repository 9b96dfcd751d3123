//! Outbound message queue.
//!
//! Buffers client-to-server messages issued before the connection is ready
//! and releases them strictly in submission order. Each entry carries the
//! oneshot that resolves the caller's `send()` future: acked `Ok` when the
//! frame hits the wire, `Err` if the connection is torn down first.
//!
//! The queue is owned exclusively by the connection task; callers reach it
//! only through `send()`.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;

use tokio::sync::oneshot;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::ClientMessage;

// ============================================================================
// PendingMessage
// ============================================================================

/// A queued outbound message and its completion channel.
#[derive(Debug)]
pub struct PendingMessage {
    /// The message to transmit.
    pub message: ClientMessage,

    /// Resolves the caller's `send()` future.
    pub ack: oneshot::Sender<Result<()>>,
}

impl PendingMessage {
    /// Creates a pending entry.
    #[inline]
    #[must_use]
    pub fn new(message: ClientMessage, ack: oneshot::Sender<Result<()>>) -> Self {
        Self { message, ack }
    }

    /// Rejects the entry with the consistent teardown error.
    pub fn reject(self) {
        let _ = self.ack.send(Err(Error::ConnectionClosed));
    }
}

// ============================================================================
// OutboundQueue
// ============================================================================

/// Strict-FIFO buffer of unsent messages.
#[derive(Debug, Default)]
pub struct OutboundQueue {
    entries: VecDeque<PendingMessage>,
}

impl OutboundQueue {
    /// Creates an empty queue.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    /// Appends an entry at the tail.
    #[inline]
    pub fn push(&mut self, entry: PendingMessage) {
        self.entries.push_back(entry);
    }

    /// Removes and returns the head entry.
    #[inline]
    pub fn pop(&mut self) -> Option<PendingMessage> {
        self.entries.pop_front()
    }

    /// Returns the number of buffered entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is buffered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rejects every buffered entry with [`Error::ConnectionClosed`].
    ///
    /// Called on every teardown path (deliberate close, kick, exhausted
    /// retries) so no message is ever silently dropped.
    pub fn reject_all(&mut self) {
        if self.entries.is_empty() {
            return;
        }

        let count = self.entries.len();
        for entry in self.entries.drain(..) {
            entry.reject();
        }
        debug!(count, "rejected queued messages");
    }
}

impl Drop for OutboundQueue {
    fn drop(&mut self) {
        // Dropped acks would leave callers with a bare channel error
        // instead of the teardown error.
        self.reject_all();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn entry(content: &str) -> (PendingMessage, oneshot::Receiver<Result<()>>) {
        let (tx, rx) = oneshot::channel();
        let msg = ClientMessage::user_message(json!({ "content": content }));
        (PendingMessage::new(msg, tx), rx)
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = OutboundQueue::new();
        let (first, _rx1) = entry("first");
        let (second, _rx2) = entry("second");
        let (third, _rx3) = entry("third");

        queue.push(first);
        queue.push(second);
        queue.push(third);
        assert_eq!(queue.len(), 3);

        let order: Vec<String> = std::iter::from_fn(|| queue.pop())
            .map(|e| e.message.data.expect("data")["content"].as_str().unwrap().to_owned())
            .collect();

        assert_eq!(order, ["first", "second", "third"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_reject_all_resolves_every_ack() {
        let mut queue = OutboundQueue::new();
        let (first, mut rx1) = entry("first");
        let (second, mut rx2) = entry("second");

        queue.push(first);
        queue.push(second);
        queue.reject_all();

        assert!(queue.is_empty());
        for rx in [&mut rx1, &mut rx2] {
            let result = rx.try_recv().expect("ack delivered");
            assert!(matches!(result, Err(Error::ConnectionClosed)));
        }
    }

    #[test]
    fn test_reject_all_on_empty_queue_is_noop() {
        let mut queue = OutboundQueue::new();
        queue.reject_all();
        assert!(queue.is_empty());
    }

    #[test]
    fn test_queue_usable_after_reject() {
        let mut queue = OutboundQueue::new();
        let (first, _rx) = entry("first");
        queue.push(first);
        queue.reject_all();

        let (second, _rx2) = entry("second");
        queue.push(second);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_drop_rejects_remaining_entries() {
        let (entry, mut rx) = entry("left behind");
        {
            let mut queue = OutboundQueue::new();
            queue.push(entry);
        }
        let result = rx.try_recv().expect("ack delivered");
        assert!(matches!(result, Err(Error::ConnectionClosed)));
    }
}
