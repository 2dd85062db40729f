//! The sticky-error reader over a received byte buffer.
//!
//! Decoders issue their whole sequence of reads and check the error slot once at the end. After
//! the first failure every further read is a no-op returning a zero value, which keeps decoder
//! bodies linear with a single fallible exit point.

use crate::text::TextComponent;
use crate::{Error, Position, VarInt, VarLong, codec};
use bytes::{Buf, Bytes};
use uuid::Uuid;

pub struct Reader {
    buf: Bytes,
    err: Option<Error>,
}

impl Reader {
    pub fn new(buf: Bytes) -> Self {
        Self { buf, err: None }
    }

    /// Returns the sticky error of this reader, if any read failed so far.
    pub fn error(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    /// Takes the sticky error out of this reader, leaving it usable for error-free sequences.
    pub fn finish(&mut self) -> Result<(), Error> {
        match self.err.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Returns the bytes that have not been consumed yet.
    pub fn remaining(&self) -> &[u8] {
        &self.buf
    }

    fn read_with<T: Default>(
        &mut self,
        read: impl FnOnce(&mut Bytes) -> Result<T, Error>,
    ) -> T {
        if self.err.is_some() {
            return T::default();
        }
        match read(&mut self.buf) {
            Ok(value) => value,
            Err(err) => {
                self.err = Some(err);
                T::default()
            }
        }
    }

    pub fn read_bool(&mut self) -> bool {
        self.read_with(codec::read_bool)
    }

    pub fn read_byte(&mut self) -> i8 {
        self.read_with(codec::read_byte)
    }

    pub fn read_ubyte(&mut self) -> u8 {
        self.read_with(codec::read_ubyte)
    }

    pub fn read_short(&mut self) -> i16 {
        self.read_with(codec::read_short)
    }

    pub fn read_ushort(&mut self) -> u16 {
        self.read_with(codec::read_ushort)
    }

    pub fn read_int(&mut self) -> i32 {
        self.read_with(codec::read_int)
    }

    pub fn read_long(&mut self) -> i64 {
        self.read_with(codec::read_long)
    }

    pub fn read_float(&mut self) -> f32 {
        self.read_with(codec::read_float)
    }

    pub fn read_double(&mut self) -> f64 {
        self.read_with(codec::read_double)
    }

    pub fn read_varint(&mut self) -> VarInt {
        self.read_with(codec::read_varint)
    }

    pub fn read_varlong(&mut self) -> VarLong {
        self.read_with(codec::read_varlong)
    }

    pub fn read_string(&mut self) -> String {
        self.read_with(codec::read_string)
    }

    pub fn read_string_bounded(&mut self, max_chars: usize) -> String {
        self.read_with(|buf| codec::read_string_bounded(buf, max_chars))
    }

    pub fn read_identifier(&mut self) -> String {
        self.read_with(codec::read_identifier)
    }

    pub fn read_position(&mut self) -> Position {
        self.read_with(codec::read_position)
    }

    pub fn read_uuid(&mut self) -> Uuid {
        self.read_with(codec::read_uuid)
    }

    pub fn read_bitset(&mut self) -> Vec<i64> {
        self.read_with(codec::read_bitset)
    }

    pub fn read_fixed_bitset(&mut self, bits: usize) -> Bytes {
        self.read_with(|buf| codec::read_fixed_bitset(buf, bits))
    }

    pub fn read_byte_array(&mut self) -> Bytes {
        self.read_with(codec::read_byte_array)
    }

    pub fn read_fixed_byte_array(&mut self, length: usize) -> Bytes {
        self.read_with(|buf| codec::read_fixed_byte_array(buf, length))
    }

    pub fn read_text_component(&mut self) -> TextComponent {
        self.read_with(codec::read_text_component)
    }
}
