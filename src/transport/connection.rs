//! # Connection Driver
//!
//! One lightweight task per connection drives decode -> dispatch for that
//! connection; tasks for different connections run concurrently and share no
//! mutable frame-decode state.
//!
//! The inbound path is strictly sequential: frames are decoded and
//! dispatched in arrival order, which is what gives handlers wire-order
//! guarantees. Waiting for more bytes suspends the task rather than blocking
//! a worker thread. Outbound packets flow through the connection's bounded
//! queue and are written in issue order.
//!
//! ## Teardown
//! When the inbound stream ends (peer closed, fatal framing error, or
//! shutdown), the connection stops accepting new outbound packets, gives
//! already-queued writes a bounded quiet period to flush, then closes the
//! transport and drops its buffers. Sends issued after teardown begins
//! report [`WriteFailure`](crate::error::WireError::WriteFailure).

use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, WriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, warn};

use crate::config::WireConfig;
use crate::core::codec::{Packet, PacketCodec};
use crate::core::frame::FrameCodec;
use crate::protocol::dispatcher::{Context, Dispatcher, SessionState};
use crate::protocol::sender::PacketSender;
use crate::protocol::Protocol;
use crate::ConnectionId;

/// Handle to a spawned connection: its identity, its outbound sender, and
/// completion of its driver task.
#[derive(Debug)]
pub struct ConnectionHandle<P: Packet> {
    id: ConnectionId,
    sender: PacketSender<P>,
    task: JoinHandle<()>,
}

impl<P: Packet> ConnectionHandle<P> {
    /// Identity of this connection.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Outbound gateway for this connection.
    pub fn sender(&self) -> &PacketSender<P> {
        &self.sender
    }

    /// Wait until the connection has fully torn down.
    pub async fn closed(self) {
        let _ = self.task.await;
    }

    /// Forcibly stop the connection's driver task.
    pub fn abort(&self) {
        self.task.abort();
    }
}

/// Spawn the driver task for one accepted or dialed stream.
///
/// The returned handle owns an outbound sender; more can be cloned from it
/// and handed to game logic.
pub fn spawn<T, P, S>(stream: T, protocol: &Protocol<P, S>) -> ConnectionHandle<P>
where
    T: AsyncRead + AsyncWrite + Send + 'static,
    P: Packet,
    S: SessionState,
{
    let id = ConnectionId::next();
    let (queue_tx, queue_rx) = mpsc::channel(protocol.wire().outbound_queue_limit);
    let sender = PacketSender::new(id, queue_tx);

    let task = tokio::spawn(drive(
        id,
        stream,
        protocol.codec().clone(),
        Arc::clone(protocol.dispatcher()),
        protocol.initial_state(),
        sender.clone(),
        queue_rx,
        protocol.wire().clone(),
    ));

    ConnectionHandle { id, sender, task }
}

#[allow(clippy::too_many_arguments)]
async fn drive<T, P, S>(
    id: ConnectionId,
    stream: T,
    codec: PacketCodec<P>,
    dispatcher: Arc<Dispatcher<P, S>>,
    mut state: S,
    sender: PacketSender<P>,
    mut outbound: mpsc::Receiver<P>,
    wire: WireConfig,
) where
    T: AsyncRead + AsyncWrite + Send + 'static,
    P: Packet,
    S: SessionState,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let mut inbound = FramedRead::new(read_half, FrameCodec::new(wire.max_frame_len));
    let mut sink = FramedWrite::new(write_half, FrameCodec::new(wire.max_frame_len));

    info!(connection = %id, "connection open");

    loop {
        tokio::select! {
            next = inbound.next() => {
                match next {
                    None => {
                        debug!(connection = %id, "peer closed the stream");
                        break;
                    }
                    Some(Err(e)) => {
                        // Framing errors are stream-level: alignment is gone.
                        warn!(connection = %id, error = %e, "stream error, closing connection");
                        break;
                    }
                    Some(Ok(frame)) => match codec.decode(&frame) {
                        Ok(packet) => {
                            let mut cx = Context::new(id, &mut state, &sender);
                            if let Err(e) = dispatcher.dispatch(&packet, &mut cx) {
                                warn!(connection = %id, error = %e, "handler failed, packet dropped");
                            }
                        }
                        Err(e) if e.is_fatal() => {
                            warn!(connection = %id, error = %e, "unrecoverable decode error, closing connection");
                            break;
                        }
                        Err(e) => {
                            // Framing already fixed this packet's extent, so
                            // the stream is still aligned. Drop and move on.
                            warn!(connection = %id, error = %e, "dropping packet");
                        }
                    },
                }
            }
            queued = outbound.recv() => {
                // This task holds `sender`, so the queue cannot close here.
                if let Some(packet) = queued {
                    if !write_packet(id, &codec, &mut sink, packet).await {
                        break;
                    }
                }
            }
        }
    }

    // Teardown: no new work may be queued once this point is reached.
    outbound.close();

    let drain = async {
        while let Some(packet) = outbound.recv().await {
            if !write_packet(id, &codec, &mut sink, packet).await {
                return;
            }
        }
        if let Err(e) = sink.flush().await {
            debug!(connection = %id, error = %e, "flush failed during teardown");
        }
    };

    if tokio::time::timeout(wire.quiet_period, drain).await.is_err() {
        warn!(connection = %id, "quiet period elapsed before outbound drained");
    }

    info!(connection = %id, "connection closed");
}

/// Encode and write one outbound packet. Returns `false` when the transport
/// is no longer writable; encode failures skip the packet but keep the
/// connection.
async fn write_packet<P, W>(
    id: ConnectionId,
    codec: &PacketCodec<P>,
    sink: &mut FramedWrite<WriteHalf<W>, FrameCodec>,
    packet: P,
) -> bool
where
    P: Packet,
    W: AsyncRead + AsyncWrite,
{
    let body = match codec.encode(&packet) {
        Ok(body) => body,
        Err(e) => {
            warn!(connection = %id, error = %e, "failed to encode outbound packet, skipping");
            return true;
        }
    };

    match sink.send(body).await {
        Ok(()) => true,
        Err(e) => {
            warn!(connection = %id, error = %e, "outbound write failed");
            false
        }
    }
}
