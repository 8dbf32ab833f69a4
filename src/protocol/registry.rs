//! # Opcode Registry
//!
//! The fixed mapping from opcode to packet decode function, built once at
//! process start and immutable afterwards. Connections share it through an
//! `Arc` and read it without locking.
//!
//! Construction is explicit: build a registry, hand it to the codec, discard
//! it when done. Nothing here is process-global, so tests can construct a
//! registry with a couple of fake packet types and verify codec behavior in
//! isolation.

use crate::core::buffer::ReadCursor;
use crate::core::codec::{Opcode, Packet};
use crate::error::{Result, WireError};

/// Payload decoder for one packet type. Receives a cursor positioned at the
/// start of the payload (the opcode is already consumed).
pub type DecodeFn<P> = fn(&mut ReadCursor<'_>) -> Result<P>;

/// One registered packet type.
#[derive(Debug)]
pub struct RegistryEntry<P: Packet> {
    /// Packet type name, used in logs when a payload is rejected.
    pub name: &'static str,
    /// Payload decode function.
    pub decode: DecodeFn<P>,
}

/// Immutable opcode table. Dense: opcodes index a vector, so lookups on the
/// hot decode path are a bounds check and a load.
#[derive(Debug)]
pub struct OpcodeRegistry<P: Packet> {
    entries: Vec<Option<RegistryEntry<P>>>,
    registered: usize,
}

impl<P: Packet> OpcodeRegistry<P> {
    /// Start building a registry.
    pub fn builder() -> RegistryBuilder<P> {
        RegistryBuilder {
            entries: Vec::new(),
        }
    }

    /// Look up the entry for an opcode.
    #[inline]
    pub fn get(&self, opcode: Opcode) -> Option<&RegistryEntry<P>> {
        self.entries.get(opcode as usize).and_then(Option::as_ref)
    }

    /// Packet type name for an opcode, if registered.
    pub fn name_of(&self, opcode: Opcode) -> Option<&'static str> {
        self.get(opcode).map(|e| e.name)
    }

    /// Number of registered packet types.
    pub fn len(&self) -> usize {
        self.registered
    }

    /// Whether the registry holds no packet types.
    pub fn is_empty(&self) -> bool {
        self.registered == 0
    }
}

/// Accumulates registrations, then validates the table once.
pub struct RegistryBuilder<P: Packet> {
    entries: Vec<(Opcode, RegistryEntry<P>)>,
}

impl<P: Packet> RegistryBuilder<P> {
    /// Register a packet type under `opcode`. Chainable.
    #[must_use]
    pub fn register(mut self, opcode: Opcode, name: &'static str, decode: DecodeFn<P>) -> Self {
        self.entries.push((opcode, RegistryEntry { name, decode }));
        self
    }

    /// Validate and produce the immutable registry.
    ///
    /// Two packet types claiming the same opcode is a startup-fatal
    /// [`WireError::Misconfiguration`].
    pub fn build(self) -> Result<OpcodeRegistry<P>> {
        let top = self
            .entries
            .iter()
            .map(|(op, _)| *op as usize)
            .max()
            .map_or(0, |m| m + 1);

        let mut table: Vec<Option<RegistryEntry<P>>> = Vec::new();
        table.resize_with(top, || None);

        let registered = self.entries.len();
        for (opcode, entry) in self.entries {
            let slot = &mut table[opcode as usize];
            if let Some(existing) = slot {
                return Err(WireError::Misconfiguration(format!(
                    "opcode {opcode:#06x} registered twice: {} and {}",
                    existing.name, entry.name
                )));
            }
            *slot = Some(entry);
        }

        Ok(OpcodeRegistry {
            entries: table,
            registered,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::core::buffer::{Bufferable, WriteCursor};

    #[derive(Debug, PartialEq)]
    struct Ping(u32);

    impl Packet for Ping {
        fn opcode(&self) -> Opcode {
            0
        }
        fn save(&self, out: &mut WriteCursor) -> Result<()> {
            self.0.save(out)
        }
    }

    fn decode_ping(cur: &mut ReadCursor<'_>) -> Result<Ping> {
        Ok(Ping(u32::restore(cur)?))
    }

    #[test]
    fn lookup_resolves_registered_opcode() {
        let registry = OpcodeRegistry::builder()
            .register(0, "Ping", decode_ping)
            .build()
            .unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.name_of(0), Some("Ping"));
        assert!(registry.get(1).is_none());
        assert!(registry.get(0x7FFF).is_none());
    }

    #[test]
    fn duplicate_opcode_fails_the_build() {
        let err = OpcodeRegistry::builder()
            .register(3, "Ping", decode_ping)
            .register(3, "PingAgain", decode_ping)
            .build()
            .unwrap_err();

        match err {
            WireError::Misconfiguration(msg) => {
                assert!(msg.contains("0x0003"));
                assert!(msg.contains("Ping"));
                assert!(msg.contains("PingAgain"));
            }
            other => panic!("expected Misconfiguration, got {other:?}"),
        }
    }

    #[test]
    fn sparse_registration_leaves_gaps_unknown() {
        let registry = OpcodeRegistry::builder()
            .register(0, "Ping", decode_ping)
            .register(5, "LatePing", decode_ping)
            .build()
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.get(0).is_some());
        assert!(registry.get(3).is_none());
        assert!(registry.get(5).is_some());
    }

    #[test]
    fn empty_registry_builds() {
        let registry = OpcodeRegistry::<Ping>::builder().build().unwrap();
        assert!(registry.is_empty());
        assert!(registry.get(0).is_none());
    }
}
