//! The sticky-error writer accumulating an outbound byte buffer.
//!
//! The symmetric counterpart of [`Reader`](crate::reader::Reader): encoders chain one call per
//! field and collect the buffer and the sticky error once at the end. After the first failure
//! every further write is a no-op.

use crate::text::TextComponent;
use crate::{Error, Position, VarInt, VarLong, codec};
use bytes::{Bytes, BytesMut};
use uuid::Uuid;

#[derive(Default)]
pub struct Writer {
    buf: BytesMut,
    err: Option<Error>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the sticky error of this writer, if any write failed so far.
    pub fn error(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    /// Returns the accumulated bytes, or the sticky error if any write failed.
    pub fn finish(self) -> Result<Bytes, Error> {
        match self.err {
            Some(err) => Err(err),
            None => Ok(self.buf.freeze()),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_bool(&mut self, value: bool) -> &mut Self {
        if self.err.is_none() {
            codec::write_bool(&mut self.buf, value);
        }
        self
    }

    pub fn write_byte(&mut self, value: i8) -> &mut Self {
        if self.err.is_none() {
            codec::write_byte(&mut self.buf, value);
        }
        self
    }

    pub fn write_ubyte(&mut self, value: u8) -> &mut Self {
        if self.err.is_none() {
            codec::write_ubyte(&mut self.buf, value);
        }
        self
    }

    pub fn write_short(&mut self, value: i16) -> &mut Self {
        if self.err.is_none() {
            codec::write_short(&mut self.buf, value);
        }
        self
    }

    pub fn write_ushort(&mut self, value: u16) -> &mut Self {
        if self.err.is_none() {
            codec::write_ushort(&mut self.buf, value);
        }
        self
    }

    pub fn write_int(&mut self, value: i32) -> &mut Self {
        if self.err.is_none() {
            codec::write_int(&mut self.buf, value);
        }
        self
    }

    pub fn write_long(&mut self, value: i64) -> &mut Self {
        if self.err.is_none() {
            codec::write_long(&mut self.buf, value);
        }
        self
    }

    pub fn write_float(&mut self, value: f32) -> &mut Self {
        if self.err.is_none() {
            codec::write_float(&mut self.buf, value);
        }
        self
    }

    pub fn write_double(&mut self, value: f64) -> &mut Self {
        if self.err.is_none() {
            codec::write_double(&mut self.buf, value);
        }
        self
    }

    pub fn write_varint(&mut self, value: VarInt) -> &mut Self {
        if self.err.is_none() {
            codec::write_varint(&mut self.buf, value);
        }
        self
    }

    pub fn write_varlong(&mut self, value: VarLong) -> &mut Self {
        if self.err.is_none() {
            codec::write_varlong(&mut self.buf, value);
        }
        self
    }

    pub fn write_string(&mut self, value: &str) -> &mut Self {
        if self.err.is_none() {
            codec::write_string(&mut self.buf, value);
        }
        self
    }

    pub fn write_identifier(&mut self, value: &str) -> &mut Self {
        if self.err.is_none()
            && let Err(err) = codec::write_identifier(&mut self.buf, value)
        {
            self.err = Some(err);
        }
        self
    }

    pub fn write_position(&mut self, position: Position) -> &mut Self {
        if self.err.is_none() {
            codec::write_position(&mut self.buf, position);
        }
        self
    }

    pub fn write_uuid(&mut self, value: &Uuid) -> &mut Self {
        if self.err.is_none() {
            codec::write_uuid(&mut self.buf, value);
        }
        self
    }

    pub fn write_bitset(&mut self, words: &[i64]) -> &mut Self {
        if self.err.is_none() {
            codec::write_bitset(&mut self.buf, words);
        }
        self
    }

    pub fn write_fixed_bitset(&mut self, bytes: &[u8]) -> &mut Self {
        if self.err.is_none() {
            codec::write_fixed_bitset(&mut self.buf, bytes);
        }
        self
    }

    pub fn write_byte_array(&mut self, bytes: &[u8]) -> &mut Self {
        if self.err.is_none() {
            codec::write_byte_array(&mut self.buf, bytes);
        }
        self
    }

    pub fn write_fixed_byte_array(&mut self, bytes: &[u8]) -> &mut Self {
        if self.err.is_none() {
            codec::write_fixed_byte_array(&mut self.buf, bytes);
        }
        self
    }

    pub fn write_text_component(&mut self, component: &TextComponent) -> &mut Self {
        if self.err.is_none()
            && let Err(err) = codec::write_text_component(&mut self.buf, component)
        {
            self.err = Some(err);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chained_writes_accumulate_in_order() {
        let mut writer = Writer::new();
        writer
            .write_varint(300)
            .write_string("hi")
            .write_ushort(25565)
            .write_bool(true);
        let buf = writer.finish().unwrap();
        assert_eq!(&buf[..], [0xAC, 0x02, 0x02, b'h', b'i', 0x63, 0xDD, 0x01]);
    }

    #[test]
    fn a_failed_write_sticks_and_suppresses_the_rest() {
        let oversized = "a".repeat(codec::STRING_MAX_CHARS + 1);
        let mut writer = Writer::new();
        writer
            .write_varint(1)
            .write_identifier(&oversized)
            .write_long(42);
        assert!(matches!(writer.error(), Some(Error::InvalidLength(_))));
        assert_eq!(writer.len(), 1, "nothing after the failure is appended");
        assert!(matches!(writer.finish(), Err(Error::InvalidLength(_))));
    }
}
