//! # Frame Codec
//!
//! Length-delimited framing over a raw byte stream.
//!
//! ## Wire Format
//! ```text
//! [Length(2)] [Frame body: opcode + payload]
//! ```
//!
//! The length field is big-endian and counts everything after itself. It is
//! stripped before the frame body is handed upward, so the packet codec only
//! ever sees `[opcode][payload]`. This codec knows nothing about opcodes or
//! payload meaning.
//!
//! ## Security
//! - A declared length above the configured ceiling fails with
//!   [`WireError::FrameTooLarge`] before any payload bytes are interpreted
//!   or buffered. This is a stream-level error: the connection must close.
//! - Partial arrival is handled by buffering; a frame is only ever yielded
//!   whole.

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{Result, WireError};

/// Width of the length field preceding every frame.
pub const LENGTH_FIELD_LEN: usize = 2;

/// Default ceiling for one frame's body (opcode + payload).
pub const DEFAULT_MAX_FRAME_LEN: usize = 4096;

/// Splits an inbound byte stream into frames and prepends the length header
/// on the way out. One instance per connection; the partially accumulated
/// inbound bytes live in the `Framed` machinery's buffer, never shared
/// across connections.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_frame_len: usize,
}

impl FrameCodec {
    /// Codec with the given frame-body ceiling.
    ///
    /// The ceiling is clamped nowhere here; [`crate::config::WireConfig`]
    /// validates it against the 2-byte length field at startup.
    pub fn new(max_frame_len: usize) -> Self {
        Self { max_frame_len }
    }

    /// Configured frame-body ceiling.
    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_LEN)
    }
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = WireError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        if src.len() < LENGTH_FIELD_LEN {
            return Ok(None);
        }

        let declared = u16::from_be_bytes([src[0], src[1]]) as usize;
        if declared > self.max_frame_len {
            return Err(WireError::FrameTooLarge {
                declared,
                max: self.max_frame_len,
            });
        }

        if src.len() < LENGTH_FIELD_LEN + declared {
            // Reserve what the rest of this frame needs and wait for more.
            src.reserve(LENGTH_FIELD_LEN + declared - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_FIELD_LEN);
        Ok(Some(src.split_to(declared).freeze()))
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = WireError;

    fn encode(&mut self, body: Bytes, dst: &mut BytesMut) -> Result<()> {
        if body.len() > self.max_frame_len {
            return Err(WireError::FrameTooLarge {
                declared: body.len(),
                max: self.max_frame_len,
            });
        }

        dst.reserve(LENGTH_FIELD_LEN + body.len());
        dst.extend_from_slice(&(body.len() as u16).to_be_bytes());
        dst.extend_from_slice(&body);
        Ok(())
    }
}
