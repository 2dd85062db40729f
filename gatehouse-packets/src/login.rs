use crate::{Packet, VarInt};

pub mod clientbound {
    use super::*;
    use crate::text::TextComponent;
    use crate::writer::Writer;
    use crate::{ClientboundPacket, packet_uid};
    use std::sync::LazyLock;

    static UID: LazyLock<String> = LazyLock::new(packet_uid::<DisconnectPacket>);

    /// The [`DisconnectPacket`].
    ///
    /// This packet terminates the login attempt and shows the reason on the client's disconnect
    /// screen. The reason travels as the JSON form of a text component.
    ///
    /// [Minecraft Docs](https://minecraft.wiki/w/Java_Edition_protocol#Disconnect_(login))
    #[derive(Debug, Clone, PartialEq)]
    pub struct DisconnectPacket {
        /// The reason shown to the disconnected player.
        pub reason: TextComponent,
    }

    impl Packet for DisconnectPacket {
        const ID: VarInt = 0x00;

        fn uid() -> &'static str {
            &UID
        }
    }

    impl ClientboundPacket for DisconnectPacket {
        fn encode_body(&self, writer: &mut Writer) {
            writer.write_text_component(&self.reason);
        }
    }
}
