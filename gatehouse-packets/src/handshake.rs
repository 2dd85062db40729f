use crate::registry::Registry;
use crate::{Packet, ProtocolState, ServerboundPacket, VarInt};

/// Registers the decoders of this module into the supplied registry.
pub fn register(registry: &mut Registry) {
    registry.register(
        ProtocolState::Handshaking,
        serverbound::HandshakePacket::ID,
        serverbound::HandshakePacket::decode,
    );
}

pub mod serverbound {
    use super::*;
    use crate::reader::Reader;
    use crate::{DecodedPacket, Error, ServerboundPacket, packet_uid};
    use std::sync::LazyLock;

    /// The maximum number of characters in the pretended server address.
    pub const SERVER_ADDRESS_MAX_CHARS: usize = 255;

    static UID: LazyLock<String> = LazyLock::new(packet_uid::<HandshakePacket>);

    /// The [`HandshakePacket`].
    ///
    /// This packet switches the connection into the requested target state. It is sent right
    /// after opening the TCP connection and is the only packet valid in the
    /// [`Handshaking`](ProtocolState::Handshaking) state.
    ///
    /// [Minecraft Docs](https://minecraft.wiki/w/Java_Edition_protocol#Handshake)
    #[derive(Debug, Clone, Eq, PartialEq)]
    pub struct HandshakePacket {
        /// The pretended protocol version.
        pub protocol_version: VarInt,
        /// The pretended server address.
        pub server_address: String,
        /// The pretended server port.
        pub server_port: u16,
        /// The protocol state to switch into.
        pub next_state: ProtocolState,
    }

    impl Packet for HandshakePacket {
        const ID: VarInt = 0x00;

        fn uid() -> &'static str {
            &UID
        }
    }

    impl ServerboundPacket for HandshakePacket {
        fn decode(reader: &mut Reader) -> Result<DecodedPacket, Error> {
            let protocol_version = reader.read_varint();
            let server_address = reader.read_string_bounded(SERVER_ADDRESS_MAX_CHARS);
            let server_port = reader.read_ushort();
            let next_state = reader.read_varint();
            reader.finish()?;

            Ok(DecodedPacket::Handshake(Self {
                protocol_version,
                server_address,
                server_port,
                next_state: next_state.try_into()?,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::serverbound::HandshakePacket;
    use crate::reader::Reader;
    use crate::writer::Writer;
    use crate::{DecodedPacket, Error, ProtocolState, ServerboundPacket};

    // protocol=767, address="localhost", port=25565, next=2
    const MINIMAL_BODY: &[u8] = &[
        0xFF, 0x05, 0x09, b'l', b'o', b'c', b'a', b'l', b'h', b'o', b's', b't', 0x63, 0xDD, 0x02,
    ];

    #[test]
    fn decodes_the_minimal_handshake_body() {
        let mut reader = Reader::new(bytes::Bytes::from_static(MINIMAL_BODY));
        let packet = HandshakePacket::decode(&mut reader).unwrap();
        assert_eq!(
            packet,
            DecodedPacket::Handshake(HandshakePacket {
                protocol_version: 767,
                server_address: "localhost".to_owned(),
                server_port: 25565,
                next_state: ProtocolState::Login,
            })
        );
        assert!(reader.remaining().is_empty());
    }

    #[test]
    fn written_fields_decode_back_to_the_same_packet() {
        let mut writer = Writer::new();
        writer
            .write_varint(770)
            .write_string("play.example.net")
            .write_ushort(25566)
            .write_varint(1);
        let mut reader = Reader::new(writer.finish().unwrap());
        let DecodedPacket::Handshake(packet) = HandshakePacket::decode(&mut reader).unwrap();
        assert_eq!(packet.protocol_version, 770);
        assert_eq!(packet.server_address, "play.example.net");
        assert_eq!(packet.server_port, 25566);
        assert_eq!(packet.next_state, ProtocolState::Status);
    }

    #[test]
    fn an_unknown_next_state_fails_the_decode() {
        let mut writer = Writer::new();
        writer
            .write_varint(767)
            .write_string("localhost")
            .write_ushort(25565)
            .write_varint(4);
        let mut reader = Reader::new(writer.finish().unwrap());
        assert!(matches!(
            HandshakePacket::decode(&mut reader),
            Err(Error::InvalidStateTransition(4))
        ));
    }

    #[test]
    fn a_truncated_body_fails_the_decode() {
        let mut reader = Reader::new(bytes::Bytes::from_static(&MINIMAL_BODY[..6]));
        assert!(matches!(
            HandshakePacket::decode(&mut reader),
            Err(Error::TruncatedBuffer)
        ));
    }

    #[test]
    fn an_oversized_server_address_fails_the_decode() {
        let mut writer = Writer::new();
        writer
            .write_varint(767)
            .write_string(&"a".repeat(255 * 3 + 4))
            .write_ushort(25565)
            .write_varint(2);
        let mut reader = Reader::new(writer.finish().unwrap());
        assert!(matches!(
            HandshakePacket::decode(&mut reader),
            Err(Error::InvalidLength(_))
        ));
    }
}
