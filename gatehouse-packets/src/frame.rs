//! Extraction of length-prefixed packet frames from an accumulating read buffer.
//!
//! A frame on the uncompressed wire is `VarInt length || VarInt id || body`. TCP delivers
//! arbitrary slices of that stream, so the per-connection read loop appends whatever arrives to a
//! scratch buffer and calls [`extract`] until it yields nothing; a frame is only emitted once all
//! of its declared bytes are buffered.

use crate::{Error, VarInt, codec};
use bytes::{Buf, Bytes, BytesMut};

/// The maximum tolerated frame length in bytes, matching the vanilla packet size bound.
pub const MAX_FRAME_LENGTH: usize = 0x20_0000;

/// Splits the next complete frame off the front of `acc`, length prefix included.
///
/// Returns `Ok(None)` while the buffered bytes only hold a partial frame. A length prefix that
/// overflows its five bytes, is negative or exceeds [`MAX_FRAME_LENGTH`] cannot be resynchronized
/// and fails with [`Error::MalformedFrame`].
pub fn extract(acc: &mut BytesMut) -> Result<Option<Bytes>, Error> {
    let mut peek: &[u8] = &acc[..];
    let length = match codec::read_varint(&mut peek) {
        Ok(length) => length,
        Err(Error::TruncatedBuffer) => return Ok(None),
        Err(_) => return Err(Error::MalformedFrame),
    };
    if length < 0 || length as usize > MAX_FRAME_LENGTH {
        return Err(Error::MalformedFrame);
    }

    let prefix = acc.len() - peek.remaining();
    let total = prefix + length as usize;
    if acc.len() < total {
        return Ok(None);
    }
    Ok(Some(acc.split_to(total).freeze()))
}

/// Prepends the length prefix to a `VarInt id || body` payload, forming a full frame.
pub fn enclose(payload: &[u8]) -> Bytes {
    let mut framed = BytesMut::with_capacity(payload.len() + 3);
    codec::write_varint(&mut framed, payload.len() as VarInt);
    framed.extend_from_slice(payload);
    framed.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_a_complete_frame_with_its_prefix() {
        let wire: &[u8] = &[
            0x10, 0x00, 0xFF, 0x05, 0x09, b'l', b'o', b'c', b'a', b'l', b'h', b'o', b's', b't',
            0x63, 0xDD, 0x02,
        ];
        let mut acc = BytesMut::from(wire);
        let frame = extract(&mut acc).unwrap().unwrap();
        assert_eq!(&frame[..], wire);
        assert!(acc.is_empty());
    }

    #[test]
    fn partial_frames_stay_buffered() {
        let mut acc = BytesMut::from(&[0x10, 0x00, 0xFF, 0x05, 0x09, b'l', b'o'][..]);
        assert!(extract(&mut acc).unwrap().is_none());
        assert_eq!(acc.len(), 7, "pending bytes must not be consumed");
    }

    #[test]
    fn a_split_length_prefix_stays_buffered() {
        // 300-byte frame: the prefix itself arrives one byte at a time
        let mut acc = BytesMut::from(&[0xAC][..]);
        assert!(extract(&mut acc).unwrap().is_none());
        acc.extend_from_slice(&[0x02]);
        assert!(extract(&mut acc).unwrap().is_none());
        acc.extend_from_slice(&vec![0; 300]);
        let frame = extract(&mut acc).unwrap().unwrap();
        assert_eq!(frame.len(), 302);
    }

    #[test]
    fn multiple_frames_per_read_are_split_apart() {
        let mut acc = BytesMut::new();
        acc.extend_from_slice(&[0x02, 0x7F, 0x00]);
        acc.extend_from_slice(&[0x01, 0x05]);
        assert_eq!(&extract(&mut acc).unwrap().unwrap()[..], [0x02, 0x7F, 0x00]);
        assert_eq!(&extract(&mut acc).unwrap().unwrap()[..], [0x01, 0x05]);
        assert!(extract(&mut acc).unwrap().is_none());
    }

    #[test]
    fn an_overlong_length_prefix_is_malformed() {
        let mut acc = BytesMut::from(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01][..]);
        assert!(matches!(extract(&mut acc), Err(Error::MalformedFrame)));
    }

    #[test]
    fn an_oversized_declared_length_is_malformed() {
        let mut acc = BytesMut::new();
        codec::write_varint(&mut acc, (MAX_FRAME_LENGTH + 1) as VarInt);
        assert!(matches!(extract(&mut acc), Err(Error::MalformedFrame)));
    }

    #[test]
    fn enclose_round_trips_through_extract() {
        let frame = enclose(&[0x00, 0xAA, 0xBB]);
        let mut acc = BytesMut::from(&frame[..]);
        assert_eq!(extract(&mut acc).unwrap().unwrap(), frame);
    }
}
