//! # Packet Codec
//!
//! Turns one frame into one typed packet and back.
//!
//! A frame body is `[opcode: u16 BE][payload]`. Decode reads the opcode,
//! resolves it in the [`OpcodeRegistry`], and hands the remaining bytes to
//! the registered decode function as a payload-relative cursor. Encode
//! writes the opcode and delegates the payload to the packet's
//! [`save`](Packet::save).
//!
//! Splitting opcode resolution from payload parsing keeps new packet types
//! cheap: a [`Bufferable`](crate::core::buffer::Bufferable) implementation
//! and one registry entry, with no change to framing or dispatch.
//!
//! ## Error scope
//! Both decode failures here are per-packet, not per-connection: framing has
//! already established the frame's exact byte extent, so the stream remains
//! aligned after the bad packet is discarded.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use tracing::trace;

use crate::core::buffer::{ReadCursor, WriteCursor};
use crate::error::{Result, WireError};
use crate::protocol::registry::OpcodeRegistry;

/// Fixed-width integer identifying a packet's type on the wire.
pub type Opcode = u16;

/// Width of the opcode at the front of every frame body.
pub const OPCODE_LEN: usize = 2;

/// A typed wire packet: an opcode implied by the type, plus payload fields.
///
/// Packets are ephemeral: constructed for one encode or decode + dispatch
/// cycle and not retained after the handler returns. The decode direction is
/// registered per opcode in the [`OpcodeRegistry`]; this trait carries the
/// encode direction.
pub trait Packet: fmt::Debug + Send + Sized + 'static {
    /// Wire opcode for this packet value.
    fn opcode(&self) -> Opcode;

    /// Serialize the payload (everything after the opcode).
    fn save(&self, out: &mut WriteCursor) -> Result<()>;
}

/// Stateless encoder/decoder for whole packets, shared by every connection.
///
/// Holds only the immutable registry, so concurrent connections decode
/// through one instance without locking.
#[derive(Debug)]
pub struct PacketCodec<P: Packet> {
    registry: Arc<OpcodeRegistry<P>>,
}

impl<P: Packet> PacketCodec<P> {
    /// Codec over a startup-built registry.
    pub fn new(registry: Arc<OpcodeRegistry<P>>) -> Self {
        Self { registry }
    }

    /// The registry this codec resolves opcodes against.
    pub fn registry(&self) -> &OpcodeRegistry<P> {
        &self.registry
    }

    /// Decode one frame body into a packet.
    ///
    /// Fails with [`WireError::UnknownOpcode`] for an unregistered opcode and
    /// [`WireError::MalformedPayload`] (carrying the payload-relative byte
    /// offset) when the registered decode function rejects the payload. Both
    /// leave the connection usable.
    pub fn decode(&self, frame: &[u8]) -> Result<P> {
        let mut head = ReadCursor::new(frame);
        let opcode = head
            .read_u16()
            .map_err(|_| WireError::malformed(0, "frame too short for an opcode"))?;

        let entry = self
            .registry
            .get(opcode)
            .ok_or(WireError::UnknownOpcode(opcode))?;

        let mut payload = ReadCursor::new(&frame[OPCODE_LEN..]);
        let packet = (entry.decode)(&mut payload)?;

        if !payload.is_exhausted() {
            // A longer payload from a newer peer revision is not an error;
            // the frame boundary is authoritative.
            trace!(
                opcode,
                packet = entry.name,
                trailing = payload.remaining(),
                "payload has trailing bytes after restore"
            );
        }

        Ok(packet)
    }

    /// Encode one packet into a frame body ready for the frame codec.
    ///
    /// Refuses opcodes absent from the registry so a drifted registry is
    /// caught on the first send rather than by the peer.
    pub fn encode(&self, packet: &P) -> Result<Bytes> {
        let opcode = packet.opcode();
        if self.registry.get(opcode).is_none() {
            return Err(WireError::Misconfiguration(format!(
                "packet {packet:?} carries opcode {opcode:#06x} which is not registered"
            )));
        }

        let mut out = WriteCursor::new();
        out.put_u16(opcode);
        packet.save(&mut out)?;
        Ok(out.freeze())
    }
}

// Arc clone, not a codec copy: clones observe the same registry.
impl<P: Packet> Clone for PacketCodec<P> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}
