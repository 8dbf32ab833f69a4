//! # Packet Dispatcher
//!
//! Routes a decoded packet to the handler registered for its opcode and the
//! connection's current session state.
//!
//! The dispatcher itself is stateless logic over an immutable table built at
//! startup; the state value lives on the connection and selects which
//! handler set is active (a game-action packet arriving before login finds
//! no handler and is dropped, not treated as fatal). Handlers advance the
//! state explicitly through [`Context::set_state`], e.g. after a successful
//! login.
//!
//! Handlers run on the connection's task and must return quickly; anything
//! slow or blocking is offloaded with a cloned
//! [`PacketSender`](crate::protocol::sender::PacketSender).

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use tracing::debug;

use crate::core::codec::{Opcode, Packet};
use crate::error::{Result, WireError};
use crate::protocol::sender::PacketSender;
use crate::ConnectionId;

/// Marker bounds for a connection's dispatch state (e.g. an enum with
/// `PreLogin` / `InGame` variants). Blanket-implemented; never implemented
/// by hand.
pub trait SessionState: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static> SessionState for T {}

type Handler<P, S> = dyn Fn(&P, &mut Context<'_, P, S>) -> Result<()> + Send + Sync;

/// What a handler sees of its connection: identity, mutable session state,
/// and the outbound sender.
pub struct Context<'a, P: Packet, S: SessionState> {
    connection: ConnectionId,
    state: &'a mut S,
    sender: &'a PacketSender<P>,
}

impl<'a, P: Packet, S: SessionState> Context<'a, P, S> {
    /// Context for one dispatch cycle.
    pub fn new(connection: ConnectionId, state: &'a mut S, sender: &'a PacketSender<P>) -> Self {
        Self {
            connection,
            state,
            sender,
        }
    }

    /// Identity of the connection the packet arrived on.
    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    /// Current session state.
    pub fn state(&self) -> S {
        *self.state
    }

    /// Advance the connection's session state; takes effect for the next
    /// dispatched packet.
    pub fn set_state(&mut self, next: S) {
        debug!(connection = %self.connection, from = ?*self.state, to = ?next, "session state advanced");
        *self.state = next;
    }

    /// Outbound gateway for this connection.
    pub fn sender(&self) -> &PacketSender<P> {
        self.sender
    }
}

/// Immutable `(opcode, state) -> handler` table.
pub struct Dispatcher<P: Packet, S: SessionState> {
    handlers: HashMap<(Opcode, S), Box<Handler<P, S>>>,
}

impl<P: Packet, S: SessionState> Dispatcher<P, S> {
    /// Start building a dispatch table.
    pub fn builder() -> DispatcherBuilder<P, S> {
        DispatcherBuilder {
            handlers: Vec::new(),
        }
    }

    /// Route one decoded packet.
    ///
    /// No handler for `(opcode, current state)` logs and drops the packet,
    /// returning `Ok`; an out-of-state packet is a peer misbehavior, not a
    /// connection failure. A handler error is returned to the caller, which
    /// logs it and keeps the connection open.
    pub fn dispatch(&self, packet: &P, cx: &mut Context<'_, P, S>) -> Result<()> {
        let opcode = packet.opcode();
        match self.handlers.get(&(opcode, cx.state())) {
            Some(handler) => handler(packet, cx),
            None => {
                debug!(
                    connection = %cx.connection(),
                    opcode,
                    state = ?cx.state(),
                    "no handler for packet in current state, dropping"
                );
                Ok(())
            }
        }
    }

    /// Number of registered `(opcode, state)` routes.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no routes are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<P: Packet, S: SessionState> fmt::Debug for Dispatcher<P, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.handlers.len())
            .finish()
    }
}

/// Accumulates `(opcode, state)` routes, then validates the table once.
pub struct DispatcherBuilder<P: Packet, S: SessionState> {
    #[allow(clippy::type_complexity)]
    handlers: Vec<((Opcode, S), Box<Handler<P, S>>)>,
}

impl<P: Packet, S: SessionState> DispatcherBuilder<P, S> {
    /// Route `opcode` to `handler` while the connection is in `state`.
    /// Chainable. Register the same opcode under several states to make it
    /// valid in each.
    #[must_use]
    pub fn on<F>(mut self, opcode: Opcode, state: S, handler: F) -> Self
    where
        F: Fn(&P, &mut Context<'_, P, S>) -> Result<()> + Send + Sync + 'static,
    {
        self.handlers.push(((opcode, state), Box::new(handler)));
        self
    }

    /// Validate and produce the immutable dispatcher.
    ///
    /// Two handlers for the same `(opcode, state)` pair is a startup-fatal
    /// [`WireError::Misconfiguration`].
    pub fn build(self) -> Result<Dispatcher<P, S>> {
        let mut handlers = HashMap::with_capacity(self.handlers.len());
        for ((opcode, state), handler) in self.handlers {
            if handlers.insert((opcode, state), handler).is_some() {
                return Err(WireError::Misconfiguration(format!(
                    "handler for opcode {opcode:#06x} in state {state:?} registered twice"
                )));
            }
        }
        Ok(Dispatcher { handlers })
    }
}
