#![deny(clippy::all)]
#![forbid(unsafe_code)]

#[cfg(test)]
use fake::Dummy;
use std::io::ErrorKind;
use uuid::Uuid;

pub mod codec;
pub mod frame;
pub mod handshake;
pub mod login;
pub mod reader;
pub mod registry;
pub mod text;
pub mod writer;

use reader::Reader;
use writer::Writer;

pub type VarInt = i32;

pub type VarLong = i64;

/// The internal error type for all errors related to the protocol communication.
///
/// This covers failures of the binary codec (truncated buffers, malformed encodings, out-of-range
/// lengths), failures of the framed packet layer (unreadable frames, unregistered packet ids) and
/// the connection-level conditions that terminate a read loop. Errors of the underlying byte
/// exchange are wrapped from the underlying IO errors.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// An error occurred while reading or writing to the underlying byte stream.
    #[error("error reading or writing data: {0}")]
    Io(#[from] std::io::Error),

    /// The buffer ended before the declared value could be read.
    #[error("buffer has insufficient data")]
    TruncatedBuffer,

    /// The received bytes violate the wire rules of the decoded type.
    #[error("invalid encoding")]
    InvalidEncoding,

    /// A VarInt did not terminate within its maximum of five bytes.
    #[error("VarInt is too big")]
    VarIntTooBig,

    /// A VarLong did not terminate within its maximum of ten bytes.
    #[error("VarLong is too big")]
    VarLongTooBig,

    /// A declared length is negative or exceeds the cap of the decoded type.
    #[error("declared length out of range: {0}")]
    InvalidLength(VarInt),

    /// An identifier does not match the namespaced grammar.
    #[error("invalid identifier format: {0}")]
    InvalidIdentifier(String),

    /// A handshake requested a target state that does not exist.
    #[error("illegal next state: {0}")]
    InvalidStateTransition(VarInt),

    /// No decoder is registered for the received packet id in the current state.
    #[error("unknown packet state: {state:?}, id: {id}")]
    UnknownPacket {
        /// The protocol state the connection was in.
        state: ProtocolState,
        /// The wire id of the received packet.
        id: VarInt,
    },

    /// The length prefix or packet id of a frame could not be read.
    #[error("malformed frame")]
    MalformedFrame,

    /// No bytes were read within the idle window.
    #[error("read timed out")]
    ReadTimeout,

    /// The operation was aborted by the shutdown signal.
    #[error("aborted by shutdown")]
    Shutdown,
}

impl Error {
    pub fn is_connection_closed(&self) -> bool {
        let Error::Io(err) = self else {
            return false;
        };
        err.kind() == ErrorKind::UnexpectedEof
            || err.kind() == ErrorKind::ConnectionReset
            || err.kind() == ErrorKind::ConnectionAborted
            || err.kind() == ErrorKind::BrokenPipe
    }
}

/// The protocol state of a single connection, governing which packet ids are valid.
///
/// A newly accepted connection starts in [`Handshaking`](ProtocolState::Handshaking) and only
/// advances as a side effect of handling a handshake packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(test, derive(Dummy))]
#[repr(u8)]
pub enum ProtocolState {
    /// The initial state, waiting for the handshake.
    Handshaking = 0,
    /// Query the server information without connecting.
    Status = 1,
    /// Log into the server, establishing a connection.
    Login = 2,
    /// Log into the server after a transfer from another server.
    Transfer = 3,
}

impl From<ProtocolState> for VarInt {
    fn from(state: ProtocolState) -> Self {
        state as u8 as VarInt
    }
}

impl TryFrom<VarInt> for ProtocolState {
    type Error = Error;

    /// Maps a handshake `NextState` field onto a protocol state.
    ///
    /// `Handshaking` is not a legal target, so the value `0` is rejected like any other unknown
    /// value.
    fn try_from(value: VarInt) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ProtocolState::Status),
            2 => Ok(ProtocolState::Login),
            3 => Ok(ProtocolState::Transfer),
            _ => Err(Error::InvalidStateTransition(value)),
        }
    }
}

/// A block position, transported as a single bit-packed 64-bit word.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(test, derive(Dummy))]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

/// Packets are network packets that are part of the protocol definition and identified by a
/// context and ID.
pub trait Packet {
    /// The defined wire ID of this network packet.
    const ID: VarInt;

    /// Returns the stable observability tag of this packet type.
    ///
    /// The tag is the type name plus a random suffix, generated once per process.
    fn uid() -> &'static str;
}

/// Serverbound packets decode themselves from a sticky [`Reader`] positioned after the packet id.
pub trait ServerboundPacket: Packet + Sized {
    /// Reads the fields of this packet in declared order and produces the decoded variant.
    fn decode(reader: &mut Reader) -> Result<DecodedPacket, Error>;
}

/// Clientbound packets encode themselves into a complete, length-prefixed frame.
pub trait ClientboundPacket: Packet {
    /// Writes the body fields of this packet in declared order.
    fn encode_body(&self, writer: &mut Writer);

    /// Produces the full wire frame: `VarInt length || VarInt id || body`.
    fn encode(&self) -> Result<bytes::Bytes, Error> {
        let mut body = Writer::new();
        body.write_varint(Self::ID);
        self.encode_body(&mut body);
        let body = body.finish()?;

        let mut framed = Writer::new();
        framed
            .write_varint(body.len() as VarInt)
            .write_fixed_byte_array(&body);
        framed.finish()
    }
}

/// The sum of all decodable serverbound packets.
///
/// Marked non-exhaustive so consumers dispatch with a wildcard arm and keep compiling when new
/// packet types are plugged in.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodedPacket {
    Handshake(handshake::serverbound::HandshakePacket),
}

impl DecodedPacket {
    /// Returns the wire id of the contained packet.
    pub fn id(&self) -> VarInt {
        match self {
            DecodedPacket::Handshake(_) => handshake::serverbound::HandshakePacket::ID,
        }
    }

    /// Returns the observability tag of the contained packet type.
    pub fn uid(&self) -> &'static str {
        match self {
            DecodedPacket::Handshake(_) => handshake::serverbound::HandshakePacket::uid(),
        }
    }
}

fn packet_uid<T>() -> String {
    let name = std::any::type_name::<T>().rsplit("::").next().unwrap_or("packet");
    format!("{name}-{}", Uuid::new_v4())
}
