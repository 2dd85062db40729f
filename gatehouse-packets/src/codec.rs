//! The pure binary codec for the Minecraft Java Edition data types.
//!
//! Every reader takes a byte buffer with a cursor and either yields a value (advancing the
//! cursor) or fails with the reason the bytes could not be interpreted. Every writer appends the
//! wire representation to the supplied buffer. All multi-byte integers are big-endian; the
//! variable-length integers use the 7-bits-plus-continuation scheme described in the official
//! [protocol documentation][protocol-doc]. This module performs no I/O.
//!
//! [protocol-doc]: https://minecraft.wiki/w/Java_Edition_protocol#Data_types

use crate::text::TextComponent;
use crate::{Error, Position, VarInt, VarLong};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use regex::Regex;
use std::sync::LazyLock;
use uuid::Uuid;

/// The maximum number of characters in a regular string.
pub const STRING_MAX_CHARS: usize = 32767;

/// The maximum number of characters in the JSON of a text component.
pub const TEXT_COMPONENT_MAX_CHARS: usize = 262_144;

const SEGMENT_BITS: u8 = 0x7F;
const CONTINUE_BIT: u8 = 0x80;

static NAMESPACE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[a-z0-9._-]+$").unwrap());
static VALUE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new("^[a-z0-9._/-]+$").unwrap());

pub fn read_bool(buf: &mut impl Buf) -> Result<bool, Error> {
    if !buf.has_remaining() {
        return Err(Error::TruncatedBuffer);
    }
    Ok(buf.get_u8() != 0)
}

pub fn read_byte(buf: &mut impl Buf) -> Result<i8, Error> {
    if !buf.has_remaining() {
        return Err(Error::TruncatedBuffer);
    }
    Ok(buf.get_i8())
}

pub fn read_ubyte(buf: &mut impl Buf) -> Result<u8, Error> {
    if !buf.has_remaining() {
        return Err(Error::TruncatedBuffer);
    }
    Ok(buf.get_u8())
}

pub fn read_short(buf: &mut impl Buf) -> Result<i16, Error> {
    if buf.remaining() < 2 {
        return Err(Error::TruncatedBuffer);
    }
    Ok(buf.get_i16())
}

pub fn read_ushort(buf: &mut impl Buf) -> Result<u16, Error> {
    if buf.remaining() < 2 {
        return Err(Error::TruncatedBuffer);
    }
    Ok(buf.get_u16())
}

pub fn read_int(buf: &mut impl Buf) -> Result<i32, Error> {
    if buf.remaining() < 4 {
        return Err(Error::TruncatedBuffer);
    }
    Ok(buf.get_i32())
}

pub fn read_long(buf: &mut impl Buf) -> Result<i64, Error> {
    if buf.remaining() < 8 {
        return Err(Error::TruncatedBuffer);
    }
    Ok(buf.get_i64())
}

/// Reads an IEEE-754 single, transported as the bit pattern of an Int.
pub fn read_float(buf: &mut impl Buf) -> Result<f32, Error> {
    Ok(f32::from_bits(read_int(buf)? as u32))
}

/// Reads an IEEE-754 double, transported as the bit pattern of a Long.
pub fn read_double(buf: &mut impl Buf) -> Result<f64, Error> {
    Ok(f64::from_bits(read_long(buf)? as u64))
}

pub fn read_varint(buf: &mut impl Buf) -> Result<VarInt, Error> {
    let mut value: VarInt = 0;
    for position in 0..5 {
        if !buf.has_remaining() {
            return Err(Error::TruncatedBuffer);
        }
        let current = buf.get_u8();
        value |= VarInt::from(current & SEGMENT_BITS) << (7 * position);
        if current & CONTINUE_BIT == 0 {
            return Ok(value);
        }
    }
    Err(Error::VarIntTooBig)
}

pub fn read_varlong(buf: &mut impl Buf) -> Result<VarLong, Error> {
    let mut value: VarLong = 0;
    for position in 0..10 {
        if !buf.has_remaining() {
            return Err(Error::TruncatedBuffer);
        }
        let current = buf.get_u8();
        value |= VarLong::from(current & SEGMENT_BITS) << (7 * position);
        if current & CONTINUE_BIT == 0 {
            return Ok(value);
        }
    }
    Err(Error::VarLongTooBig)
}

pub fn read_string(buf: &mut impl Buf) -> Result<String, Error> {
    read_string_bounded(buf, STRING_MAX_CHARS)
}

/// Reads a VarInt-length-prefixed UTF-8 string of at most `max_chars` characters.
///
/// The byte cap is `max_chars * 3 + 3`, three bytes per character plus the prefix worst case.
pub fn read_string_bounded(buf: &mut impl Buf, max_chars: usize) -> Result<String, Error> {
    let length = read_varint(buf)?;
    if length < 0 || length as usize > max_chars * 3 + 3 {
        return Err(Error::InvalidLength(length));
    }
    let length = length as usize;
    if buf.remaining() < length {
        return Err(Error::TruncatedBuffer);
    }
    let mut raw = vec![0; length];
    buf.copy_to_slice(&mut raw);
    String::from_utf8(raw).map_err(|_| Error::InvalidEncoding)
}

/// Reads a namespaced identifier and validates it against the restricted grammar.
///
/// The namespace matches `[a-z0-9._-]+`, the value `[a-z0-9._/-]+`; the namespace may be omitted
/// together with the `:` separator.
pub fn read_identifier(buf: &mut impl Buf) -> Result<String, Error> {
    let identifier = read_string(buf)?;
    if !is_valid_identifier(&identifier) {
        return Err(Error::InvalidIdentifier(identifier));
    }
    Ok(identifier)
}

fn is_valid_identifier(identifier: &str) -> bool {
    match identifier.split_once(':') {
        Some((namespace, value)) => {
            NAMESPACE_PATTERN.is_match(namespace) && VALUE_PATTERN.is_match(value)
        }
        None => VALUE_PATTERN.is_match(identifier),
    }
}

/// Reads a position packed into a single 64-bit word as `x:26 | z:26 | y:12` bits.
///
/// The coordinates are sign-extended from their 26-, 12- and 26-bit fields.
pub fn read_position(buf: &mut impl Buf) -> Result<Position, Error> {
    let word = read_long(buf)?;
    Ok(Position {
        x: (word >> 38) as i32,
        y: ((word << 52) >> 52) as i32,
        z: ((word << 26) >> 38) as i32,
    })
}

pub fn read_uuid(buf: &mut impl Buf) -> Result<Uuid, Error> {
    if buf.remaining() < 16 {
        return Err(Error::TruncatedBuffer);
    }
    Ok(Uuid::from_u128(buf.get_u128()))
}

/// Reads a bit set as a VarInt count of 64-bit words.
pub fn read_bitset(buf: &mut impl Buf) -> Result<Vec<i64>, Error> {
    let count = read_varint(buf)?;
    if count < 0 {
        return Err(Error::InvalidLength(count));
    }
    if buf.remaining() < count as usize * 8 {
        return Err(Error::TruncatedBuffer);
    }
    let mut words = Vec::with_capacity(count as usize);
    for _ in 0..count {
        words.push(buf.get_i64());
    }
    Ok(words)
}

/// Reads a fixed bit set of `bits` bits as `ceil(bits / 8)` raw bytes.
pub fn read_fixed_bitset(buf: &mut impl Buf, bits: usize) -> Result<Bytes, Error> {
    read_fixed_byte_array(buf, bits.div_ceil(8))
}

pub fn read_byte_array(buf: &mut impl Buf) -> Result<Bytes, Error> {
    let length = read_varint(buf)?;
    if length < 0 {
        return Err(Error::InvalidLength(length));
    }
    read_fixed_byte_array(buf, length as usize)
}

pub fn read_fixed_byte_array(buf: &mut impl Buf, length: usize) -> Result<Bytes, Error> {
    if buf.remaining() < length {
        return Err(Error::TruncatedBuffer);
    }
    Ok(buf.copy_to_bytes(length))
}

/// Reads a text component transported as a byte array of UTF-8 JSON.
pub fn read_text_component(buf: &mut impl Buf) -> Result<TextComponent, Error> {
    let length = read_varint(buf)?;
    if length < 0 || length as usize > TEXT_COMPONENT_MAX_CHARS * 3 + 3 {
        return Err(Error::InvalidLength(length));
    }
    let raw = read_fixed_byte_array(buf, length as usize)?;
    serde_json::from_slice(&raw).map_err(|_| Error::InvalidEncoding)
}

pub fn write_bool(buf: &mut BytesMut, value: bool) {
    buf.put_u8(u8::from(value));
}

pub fn write_byte(buf: &mut BytesMut, value: i8) {
    buf.put_i8(value);
}

pub fn write_ubyte(buf: &mut BytesMut, value: u8) {
    buf.put_u8(value);
}

pub fn write_short(buf: &mut BytesMut, value: i16) {
    buf.put_i16(value);
}

pub fn write_ushort(buf: &mut BytesMut, value: u16) {
    buf.put_u16(value);
}

pub fn write_int(buf: &mut BytesMut, value: i32) {
    buf.put_i32(value);
}

pub fn write_long(buf: &mut BytesMut, value: i64) {
    buf.put_i64(value);
}

pub fn write_float(buf: &mut BytesMut, value: f32) {
    write_int(buf, value.to_bits() as i32);
}

pub fn write_double(buf: &mut BytesMut, value: f64) {
    write_long(buf, value.to_bits() as i64);
}

pub fn write_varint(buf: &mut BytesMut, value: VarInt) {
    let mut remainder = value as u32;
    while remainder >= u32::from(CONTINUE_BIT) {
        buf.put_u8((remainder as u8 & SEGMENT_BITS) | CONTINUE_BIT);
        remainder >>= 7;
    }
    buf.put_u8(remainder as u8);
}

pub fn write_varlong(buf: &mut BytesMut, value: VarLong) {
    let mut remainder = value as u64;
    while remainder >= u64::from(CONTINUE_BIT) {
        buf.put_u8((remainder as u8 & SEGMENT_BITS) | CONTINUE_BIT);
        remainder >>= 7;
    }
    buf.put_u8(remainder as u8);
}

pub fn write_string(buf: &mut BytesMut, value: &str) {
    write_varint(buf, value.len() as VarInt);
    buf.put_slice(value.as_bytes());
}

/// Writes an identifier, checking only the length cap; the grammar is enforced on read.
pub fn write_identifier(buf: &mut BytesMut, value: &str) -> Result<(), Error> {
    if value.len() > STRING_MAX_CHARS {
        return Err(Error::InvalidLength(value.len() as VarInt));
    }
    write_string(buf, value);
    Ok(())
}

pub fn write_position(buf: &mut BytesMut, position: Position) {
    let word = ((i64::from(position.x) & 0x3FF_FFFF) << 38)
        | ((i64::from(position.z) & 0x3FF_FFFF) << 12)
        | (i64::from(position.y) & 0xFFF);
    write_long(buf, word);
}

pub fn write_uuid(buf: &mut BytesMut, value: &Uuid) {
    buf.put_u128(value.as_u128());
}

pub fn write_bitset(buf: &mut BytesMut, words: &[i64]) {
    write_varint(buf, words.len() as VarInt);
    for word in words {
        buf.put_i64(*word);
    }
}

pub fn write_fixed_bitset(buf: &mut BytesMut, bytes: &[u8]) {
    buf.put_slice(bytes);
}

pub fn write_byte_array(buf: &mut BytesMut, bytes: &[u8]) {
    write_varint(buf, bytes.len() as VarInt);
    buf.put_slice(bytes);
}

pub fn write_fixed_byte_array(buf: &mut BytesMut, bytes: &[u8]) {
    buf.put_slice(bytes);
}

pub fn write_text_component(buf: &mut BytesMut, component: &TextComponent) -> Result<(), Error> {
    let json = serde_json::to_vec(component).map_err(|_| Error::InvalidEncoding)?;
    write_byte_array(buf, &json);
    Ok(())
}
