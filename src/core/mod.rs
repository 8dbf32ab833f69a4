//! # Core Protocol Components
//!
//! Low-level framing, cursors, and the packet codec.
//!
//! ## Components
//! - **Buffer**: read/write cursors and the `Bufferable` save/restore contract
//! - **Frame**: length-delimited framing over the byte stream
//! - **Codec**: opcode resolution + payload decode for whole packets
//!
//! ## Wire Format
//! ```text
//! [Length(2)] [Opcode(2)] [Payload(N)]
//! ```
//!
//! The length field counts opcode + payload and is stripped by the frame
//! codec; the opcode is consumed by the packet codec; the payload belongs to
//! the packet type's `Bufferable` implementation.

pub mod buffer;
pub mod codec;
pub mod frame;
