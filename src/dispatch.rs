//! Turns a raw frame into a typed decoded packet under a connection's protocol state.
//!
//! The dispatcher never transitions state; it only selects and runs a decoder. All of its
//! failures are confined to the offending frame, so a connection survives unknown or
//! undecodable packets.

use bytes::Bytes;
use gatehouse_packets::reader::Reader;
use gatehouse_packets::registry::Registry;
use gatehouse_packets::{DecodedPacket, Error, ProtocolState};

/// Decodes one complete frame (length prefix included) received in the given state.
pub fn decode(registry: &Registry, state: ProtocolState, frame: Bytes) -> Result<DecodedPacket, Error> {
    let mut reader = Reader::new(frame);

    // the frame is already delimited, the length prefix only has to be skipped
    let _length = reader.read_varint();
    let id = reader.read_varint();
    if reader.finish().is_err() {
        return Err(Error::MalformedFrame);
    }

    let Some(decoder) = registry.decoder(state, id) else {
        return Err(Error::UnknownPacket { state, id });
    };
    decoder(&mut reader)
}
