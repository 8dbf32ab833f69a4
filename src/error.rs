//! # Error Types
//!
//! Error handling for the wire-protocol layer.
//!
//! The central distinction is between errors that poison the byte stream and
//! errors that are scoped to a single packet:
//!
//! - **Stream-fatal**: [`WireError::FrameTooLarge`], [`WireError::Io`] and
//!   [`WireError::Misconfiguration`]. Once framing can no longer be trusted
//!   (or the transport itself failed) the connection must be closed, because
//!   the position of the next frame boundary is unknown.
//! - **Per-packet**: [`WireError::UnknownOpcode`],
//!   [`WireError::MalformedPayload`] and [`WireError::WriteFailure`]. Framing
//!   already established the packet's exact byte extent, so the offending
//!   packet is dropped and logged while the connection stays open.
//!
//! [`WireError::is_fatal`] encodes this split so connection loops do not have
//! to enumerate variants.

use std::borrow::Cow;
use std::io;
use thiserror::Error;

use crate::core::codec::Opcode;

/// Primary error type for all wire-protocol operations.
#[derive(Error, Debug)]
pub enum WireError {
    /// Transport-level I/O failure. Fatal to the connection.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A frame declared a length above the configured ceiling. After this
    /// the stream alignment is unknown; the connection must be closed.
    #[error("frame of {declared} bytes exceeds the {max} byte limit")]
    FrameTooLarge {
        /// Length the frame header declared (opcode + payload bytes).
        declared: usize,
        /// Configured maximum frame length.
        max: usize,
    },

    /// The opcode at the front of a frame is not present in the registry.
    /// The packet is dropped; the connection stays open.
    #[error("unknown opcode {0:#06x}")]
    UnknownOpcode(Opcode),

    /// A payload failed to restore: truncated data, an invalid encoding, or
    /// a field out of range. `offset` is the cursor position (relative to
    /// the start of the payload) where the inconsistency was detected.
    #[error("malformed payload at byte {offset}: {reason}")]
    MalformedPayload {
        /// Byte offset within the payload at the point of failure.
        offset: usize,
        /// What went wrong at that offset.
        reason: Cow<'static, str>,
    },

    /// An outbound send could not be delivered. Reported to the caller of
    /// the packet sender; never retried automatically.
    #[error("outbound write failed: {0}")]
    WriteFailure(Cow<'static, str>),

    /// Invalid registry, dispatch table or configuration, detected at
    /// startup. Fatal to process startup.
    #[error("configuration error: {0}")]
    Misconfiguration(String),
}

impl WireError {
    /// Whether this error ends the connection (or, for
    /// [`Misconfiguration`](WireError::Misconfiguration), process startup)
    /// rather than a single packet.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            WireError::Io(_) | WireError::FrameTooLarge { .. } | WireError::Misconfiguration(_)
        )
    }

    /// Shorthand for a [`MalformedPayload`](WireError::MalformedPayload) at
    /// the given cursor position.
    pub fn malformed(offset: usize, reason: impl Into<Cow<'static, str>>) -> Self {
        WireError::MalformedPayload {
            offset,
            reason: reason.into(),
        }
    }
}

/// Type alias for Results using WireError.
pub type Result<T> = std::result::Result<T, WireError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_split_matches_error_policy() {
        assert!(WireError::FrameTooLarge {
            declared: 9000,
            max: 4096
        }
        .is_fatal());
        assert!(WireError::Io(io::Error::from(io::ErrorKind::BrokenPipe)).is_fatal());
        assert!(WireError::Misconfiguration("duplicate opcode".into()).is_fatal());

        assert!(!WireError::UnknownOpcode(0x00ff).is_fatal());
        assert!(!WireError::malformed(12, "truncated string").is_fatal());
        assert!(!WireError::WriteFailure("connection closed".into()).is_fatal());
    }

    #[test]
    fn display_carries_diagnostic_context() {
        let e = WireError::malformed(7, "buffer underflow reading u32");
        assert_eq!(
            e.to_string(),
            "malformed payload at byte 7: buffer underflow reading u32"
        );

        let e = WireError::UnknownOpcode(0x0042);
        assert_eq!(e.to_string(), "unknown opcode 0x0042");
    }
}
