//! The per-connection writer handle: the router's only way to reach a peer's socket.
//!
//! Outbound envelopes are queued on a bounded `tokio::mpsc` channel. A full queue means the peer
//! cannot keep up; the router drops that single envelope rather than blocking fan-out, so one
//! slow subscriber never stalls a publish.

use tokio::sync::mpsc;

use crate::envelope::WireMessage;

/// Bounded channel capacity for a connection's outbound queue. Chosen generously so that a burst
/// of fan-out sends does not spuriously trip back-pressure under normal load.
pub const WRITER_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Queued for delivery.
    Sent,
    /// The writer queue was full; the envelope was dropped.
    QueueFull,
    /// The connection's writer task is already gone.
    Closed,
}

/// Serializes outbound sends for one connection. Cheap to clone; all clones share the same
/// underlying queue, so writes for a connection are always totally ordered.
#[derive(Debug, Clone)]
pub struct WriterHandle {
    tx: mpsc::Sender<WireMessage>,
}

impl WriterHandle {
    /// Creates a handle paired with the receiver a connection's writer task drains.
    pub fn channel() -> (Self, mpsc::Receiver<WireMessage>) {
        let (tx, rx) = mpsc::channel(WRITER_QUEUE_CAPACITY);
        (Self { tx }, rx)
    }

    /// Non-blocking send: never awaits, so fan-out over many subscribers can never be stalled by
    /// one of them.
    pub fn try_send(&self, msg: impl Into<WireMessage>) -> SendOutcome {
        match self.tx.try_send(msg.into()) {
            Ok(()) => SendOutcome::Sent,
            Err(mpsc::error::TrySendError::Full(_)) => SendOutcome::QueueFull,
            Err(mpsc::error::TrySendError::Closed(_)) => SendOutcome::Closed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::OutboundEnvelope;

    #[tokio::test]
    async fn send_then_receive() {
        let (handle, mut rx) = WriterHandle::channel();
        assert_eq!(
            handle.try_send(OutboundEnvelope::Pong { id: "p1".into() }),
            SendOutcome::Sent
        );
        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.to_json(), r#"{"type":"pong","id":"p1"}"#);
    }

    #[tokio::test]
    async fn closed_receiver_reports_closed() {
        let (handle, rx) = WriterHandle::channel();
        drop(rx);
        assert_eq!(
            handle.try_send(OutboundEnvelope::Pong { id: "p1".into() }),
            SendOutcome::Closed
        );
    }

    #[tokio::test]
    async fn full_queue_reports_queue_full_without_blocking() {
        let (tx, _rx) = mpsc::channel::<WireMessage>(1);
        let handle = WriterHandle { tx };
        assert_eq!(
            handle.try_send(OutboundEnvelope::Pong { id: "1".into() }),
            SendOutcome::Sent
        );
        assert_eq!(
            handle.try_send(OutboundEnvelope::Pong { id: "2".into() }),
            SendOutcome::QueueFull
        );
    }
}
