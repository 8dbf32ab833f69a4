//! # game-protocol
//!
//! Binary wire-protocol core shared by a game client and server: turns a
//! byte stream on a persistent connection into discrete, typed packets and
//! back, and routes decoded packets to game-logic handlers.
//!
//! ## Wire Format
//! ```text
//! [Length(2)] [Opcode(2)] [Payload(N)]
//! ```
//! All integers are big-endian. The length field counts opcode + payload.
//!
//! ## Data Flow
//! ```text
//! bytes -> FrameCodec -> PacketCodec -> Dispatcher -> handler
//!                                                        |
//! bytes <- FrameCodec <- PacketCodec <- PacketSender <---+
//! ```
//!
//! ## Failure Isolation
//! A corrupt packet never takes down a connection shared with other
//! traffic: unknown opcodes and malformed payloads are dropped and logged
//! (framing already fixed the packet's byte extent, so the stream stays
//! aligned), while oversized frame declarations and transport failures
//! close the connection, and misconfiguration is refused at startup.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//!
//! use game_protocol::config::NetworkConfig;
//! use game_protocol::core::buffer::{Bufferable, ReadCursor, WriteCursor};
//! use game_protocol::core::codec::{Opcode, Packet};
//! use game_protocol::error::Result;
//! use game_protocol::protocol::dispatcher::Dispatcher;
//! use game_protocol::protocol::registry::OpcodeRegistry;
//! use game_protocol::protocol::Protocol;
//! use game_protocol::transport::tcp;
//!
//! #[derive(Debug)]
//! enum GamePacket {
//!     Login { name: String },
//!     Walk { x: i32, y: i32 },
//! }
//!
//! impl Packet for GamePacket {
//!     fn opcode(&self) -> Opcode {
//!         match self {
//!             GamePacket::Login { .. } => 0,
//!             GamePacket::Walk { .. } => 1,
//!         }
//!     }
//!
//!     fn save(&self, out: &mut WriteCursor) -> Result<()> {
//!         match self {
//!             GamePacket::Login { name } => name.save(out),
//!             GamePacket::Walk { x, y } => {
//!                 x.save(out)?;
//!                 y.save(out)
//!             }
//!         }
//!     }
//! }
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum Session {
//!     PreLogin,
//!     InGame,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = NetworkConfig::default();
//!
//!     let registry = OpcodeRegistry::builder()
//!         .register(0, "Login", |cur| {
//!             Ok(GamePacket::Login { name: String::restore(cur)? })
//!         })
//!         .register(1, "Walk", |cur| {
//!             Ok(GamePacket::Walk { x: i32::restore(cur)?, y: i32::restore(cur)? })
//!         })
//!         .build()?;
//!
//!     let dispatcher = Dispatcher::builder()
//!         .on(0, Session::PreLogin, |_packet: &GamePacket, cx| {
//!             cx.set_state(Session::InGame);
//!             Ok(())
//!         })
//!         .on(1, Session::InGame, |_packet, _cx| Ok(()))
//!         .build()?;
//!
//!     let protocol = Arc::new(Protocol::new(
//!         registry,
//!         dispatcher,
//!         Session::PreLogin,
//!         config.wire.clone(),
//!     )?);
//!
//!     tcp::start_server(protocol, &config.server).await
//! }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod utils;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

pub use crate::config::NetworkConfig;
pub use crate::core::buffer::{Bufferable, ReadCursor, WriteCursor};
pub use crate::core::codec::{Opcode, Packet, PacketCodec};
pub use crate::core::frame::FrameCodec;
pub use crate::error::{Result, WireError};
pub use crate::protocol::dispatcher::{Context, Dispatcher};
pub use crate::protocol::registry::OpcodeRegistry;
pub use crate::protocol::sender::PacketSender;
pub use crate::protocol::Protocol;
pub use crate::transport::ConnectionHandle;

/// Identity of one live connection, unique for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocate the next process-wide identity.
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value, for embedding into game-side session records.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}
