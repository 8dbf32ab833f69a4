//! # Protocol Layer
//!
//! Opcode registry, packet dispatch, and the per-connection sender.
//!
//! ## Components
//! - **Registry**: opcode -> decode function, built once at startup
//! - **Dispatcher**: (opcode, session state) -> handler routing
//! - **Sender**: ordered, non-blocking outbound gateway per connection
//!
//! [`Protocol`] bundles the pieces every connection needs, so server and
//! client entry points take one handle instead of four.

pub mod dispatcher;
pub mod registry;
pub mod sender;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use crate::config::WireConfig;
use crate::core::codec::{Packet, PacketCodec};
use crate::error::Result;
use crate::protocol::dispatcher::{Dispatcher, SessionState};
use crate::protocol::registry::OpcodeRegistry;

/// Everything a connection needs to speak the wire protocol: the codec over
/// the opcode registry, the dispatch table, the wire settings, and the
/// session state a fresh connection starts in.
///
/// Built once at startup, validated, then shared by reference across all
/// connections; nothing inside is mutated after construction.
#[derive(Debug)]
pub struct Protocol<P: Packet, S: SessionState> {
    codec: PacketCodec<P>,
    dispatcher: Arc<Dispatcher<P, S>>,
    wire: WireConfig,
    initial_state: S,
}

impl<P: Packet, S: SessionState> Protocol<P, S> {
    /// Assemble and validate the protocol stack.
    ///
    /// Fails with [`Misconfiguration`](crate::error::WireError::Misconfiguration)
    /// when the wire settings are inconsistent (see
    /// [`WireConfig::validate`]). Registry and dispatcher arrive already
    /// validated by their builders.
    pub fn new(
        registry: OpcodeRegistry<P>,
        dispatcher: Dispatcher<P, S>,
        initial_state: S,
        wire: WireConfig,
    ) -> Result<Self> {
        wire.validate_strict()?;
        Ok(Self {
            codec: PacketCodec::new(Arc::new(registry)),
            dispatcher: Arc::new(dispatcher),
            wire,
            initial_state,
        })
    }

    /// Shared packet codec.
    pub fn codec(&self) -> &PacketCodec<P> {
        &self.codec
    }

    /// Shared dispatch table.
    pub fn dispatcher(&self) -> &Arc<Dispatcher<P, S>> {
        &self.dispatcher
    }

    /// Wire settings (frame ceiling, queue capacity, quiet period).
    pub fn wire(&self) -> &WireConfig {
        &self.wire
    }

    /// State a freshly accepted connection starts in.
    pub fn initial_state(&self) -> S {
        self.initial_state
    }
}
