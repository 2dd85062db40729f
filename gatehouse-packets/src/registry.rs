//! The process-wide packet registry, mapping `(state, id)` pairs to decoder functions.
//!
//! The registry is populated once during program start, before the first connection is accepted,
//! and never mutated afterwards. Lookups therefore need no synchronization.

use crate::reader::Reader;
use crate::{DecodedPacket, Error, ProtocolState, VarInt, handshake};
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// A decoder turns a reader positioned at a packet body into a decoded packet.
pub type Decoder = fn(&mut Reader) -> Result<DecodedPacket, Error>;

#[derive(Default)]
pub struct Registry {
    table: HashMap<ProtocolState, HashMap<VarInt, Decoder>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a decoder for a specific packet id and state.
    ///
    /// Registering the same `(state, id)` twice is a programming error; the newest decoder wins
    /// and a diagnostic is emitted.
    pub fn register(&mut self, state: ProtocolState, id: VarInt, decoder: Decoder) {
        debug!(state = ?state, id, "registering packet decoder");
        if self
            .table
            .entry(state)
            .or_default()
            .insert(id, decoder)
            .is_some()
        {
            warn!(state = ?state, id, "duplicate packet decoder registration, keeping the newest");
        }
    }

    /// Looks up the decoder for a `(state, id)` pair.
    pub fn decoder(&self, state: ProtocolState, id: VarInt) -> Option<Decoder> {
        self.table.get(&state).and_then(|ids| ids.get(&id)).copied()
    }
}

static DEFAULT: OnceLock<Registry> = OnceLock::new();

/// Builds the registry of all packets this crate ships and installs it process-wide.
///
/// The bootstrap calls this exactly once before the acceptor starts; further calls return the
/// already-installed table.
pub fn register_default_packets() -> &'static Registry {
    DEFAULT.get_or_init(|| {
        let mut registry = Registry::new();
        handshake::register(&mut registry);
        registry
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nop_decoder(_reader: &mut Reader) -> Result<DecodedPacket, Error> {
        Err(Error::MalformedFrame)
    }

    fn other_decoder(_reader: &mut Reader) -> Result<DecodedPacket, Error> {
        Err(Error::TruncatedBuffer)
    }

    #[test]
    fn registered_decoders_are_found_under_their_key() {
        let mut registry = Registry::new();
        registry.register(ProtocolState::Handshaking, 0x00, nop_decoder);
        registry.register(ProtocolState::Status, 0x00, nop_decoder);
        assert!(registry.decoder(ProtocolState::Handshaking, 0x00).is_some());
        assert!(registry.decoder(ProtocolState::Status, 0x00).is_some());
    }

    #[test]
    fn absent_pairs_report_no_decoder() {
        let mut registry = Registry::new();
        registry.register(ProtocolState::Handshaking, 0x00, nop_decoder);
        assert!(registry.decoder(ProtocolState::Handshaking, 0x7F).is_none());
        assert!(registry.decoder(ProtocolState::Login, 0x00).is_none());
    }

    #[test]
    fn duplicate_registration_keeps_the_newest() {
        let mut registry = Registry::new();
        registry.register(ProtocolState::Handshaking, 0x01, nop_decoder);
        registry.register(ProtocolState::Handshaking, 0x01, other_decoder);
        let decoder = registry.decoder(ProtocolState::Handshaking, 0x01).unwrap();
        let mut reader = Reader::new(bytes::Bytes::new());
        assert!(matches!(decoder(&mut reader), Err(Error::TruncatedBuffer)));
    }

    #[test]
    fn the_default_table_contains_the_handshake() {
        let registry = register_default_packets();
        assert!(registry.decoder(ProtocolState::Handshaking, 0x00).is_some());
    }
}
