//! # Transport Layer
//!
//! Per-connection drivers and the TCP entry points.
//!
//! A connection owns exactly one frame codec, one packet sender, and its
//! dispatch state; all of it lives inside the connection's task and is
//! released when the task ends. Decoded packets cross into game logic only
//! through dispatch; there is no cross-connection sharing of decode
//! buffers.

pub mod connection;
pub mod tcp;

pub use connection::ConnectionHandle;
