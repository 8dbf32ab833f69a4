//! # Packet Sender
//!
//! The per-connection outbound gateway handed to game logic.
//!
//! Each sender is bound to exactly one connection's writer queue. Sends are
//! non-blocking: the packet is enqueued and the call returns without waiting
//! for the bytes to reach the peer. Order is preserved: packets leave the
//! transport in the order they were issued on this sender. Failures
//! (connection closed, queue full) are reported as
//! [`WireError::WriteFailure`], never silently dropped.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::core::codec::Packet;
use crate::error::{Result, WireError};
use crate::ConnectionId;

/// Clonable handle for sending packets on one connection.
///
/// Handlers that offload work to another task clone the sender and deliver
/// their result back asynchronously:
///
/// ```ignore
/// let sender = cx.sender().clone();
/// tokio::spawn(async move {
///     let stats = load_stats().await;
///     let _ = sender.send(StatsReply::from(stats));
/// });
/// ```
#[derive(Debug)]
pub struct PacketSender<P: Packet> {
    connection: ConnectionId,
    queue: mpsc::Sender<P>,
}

impl<P: Packet> PacketSender<P> {
    /// Sender feeding the given connection's writer queue.
    pub(crate) fn new(connection: ConnectionId, queue: mpsc::Sender<P>) -> Self {
        Self { connection, queue }
    }

    /// The connection this sender is bound to.
    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    /// Enqueue one packet for transmission.
    ///
    /// Returns `&Self` so sends chain fluently:
    ///
    /// ```ignore
    /// sender.send(LoginOk::new(id))?.send(Motd::new(text))?;
    /// ```
    pub fn send(&self, packet: P) -> Result<&Self> {
        match self.queue.try_send(packet) {
            Ok(()) => Ok(self),
            Err(TrySendError::Closed(_)) => {
                Err(WireError::WriteFailure("connection closed".into()))
            }
            Err(TrySendError::Full(_)) => {
                Err(WireError::WriteFailure("outbound queue full".into()))
            }
        }
    }

    /// Whether the connection's writer is still accepting packets.
    pub fn is_open(&self) -> bool {
        !self.queue.is_closed()
    }
}

// Manual impl: `P` itself does not need to be `Clone`.
impl<P: Packet> Clone for PacketSender<P> {
    fn clone(&self) -> Self {
        Self {
            connection: self.connection,
            queue: self.queue.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::core::buffer::{Bufferable, WriteCursor};
    use crate::core::codec::Opcode;

    #[derive(Debug, PartialEq)]
    struct Tick(u32);

    impl Packet for Tick {
        fn opcode(&self) -> Opcode {
            0
        }
        fn save(&self, out: &mut WriteCursor) -> Result<()> {
            self.0.save(out)
        }
    }

    #[tokio::test]
    async fn chained_sends_preserve_issue_order() {
        let (tx, mut rx) = mpsc::channel(8);
        let sender = PacketSender::new(ConnectionId::next(), tx);

        sender
            .send(Tick(1))
            .unwrap()
            .send(Tick(2))
            .unwrap()
            .send(Tick(3))
            .unwrap();

        assert_eq!(rx.recv().await.unwrap(), Tick(1));
        assert_eq!(rx.recv().await.unwrap(), Tick(2));
        assert_eq!(rx.recv().await.unwrap(), Tick(3));
    }

    #[tokio::test]
    async fn send_after_close_reports_write_failure() {
        let (tx, rx) = mpsc::channel(8);
        let sender = PacketSender::new(ConnectionId::next(), tx);
        drop(rx);

        assert!(!sender.is_open());
        let err = sender.send(Tick(9)).unwrap_err();
        assert!(matches!(err, WireError::WriteFailure(_)));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn full_queue_reports_write_failure_without_blocking() {
        let (tx, _rx) = mpsc::channel(1);
        let sender = PacketSender::new(ConnectionId::next(), tx);

        sender.send(Tick(1)).unwrap();
        let err = sender.send(Tick(2)).unwrap_err();
        assert!(matches!(err, WireError::WriteFailure(_)));
    }

    #[tokio::test]
    async fn clones_feed_the_same_queue() {
        let (tx, mut rx) = mpsc::channel(8);
        let sender = PacketSender::new(ConnectionId::next(), tx);
        let offloaded = sender.clone();

        tokio::spawn(async move {
            offloaded.send(Tick(42)).unwrap();
        })
        .await
        .unwrap();

        assert_eq!(rx.recv().await.unwrap(), Tick(42));
    }
}
