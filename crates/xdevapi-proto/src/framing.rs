//! Message framing for the transport layer.
//!
//! Each message is `[length (4 bytes LE)][type (1 byte)][payload]`, where
//! `length` counts the type byte and the payload.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::Error;

/// Default upper bound for a single message payload (64 MB).
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Size of the length prefix plus the type byte.
pub const HEADER_SIZE: usize = LENGTH_PREFIX_SIZE + 1;

/// One typed message as it travels on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Message type byte.
    pub message_type: u8,
    /// Encoded message body.
    pub payload: Bytes,
}

impl Frame {
    /// Create a frame.
    pub fn new(message_type: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            message_type,
            payload: payload.into(),
        }
    }

    /// Append the framed bytes to `buf`.
    pub fn encode_into(&self, buf: &mut BytesMut, max_size: usize) -> Result<(), Error> {
        check_size(self.payload.len(), max_size)?;
        buf.reserve(HEADER_SIZE + self.payload.len());
        buf.put_u32_le((self.payload.len() + 1) as u32);
        buf.put_u8(self.message_type);
        buf.put_slice(&self.payload);
        Ok(())
    }
}

/// Frame a payload under the default size limit.
pub fn encode_frame(message_type: u8, payload: &[u8]) -> Result<BytesMut, Error> {
    let mut buf = BytesMut::new();
    Frame::new(message_type, Bytes::copy_from_slice(payload)).encode_into(&mut buf, MAX_MESSAGE_SIZE)?;
    Ok(buf)
}

/// Decode the payload length from a 4-byte length prefix.
///
/// The prefix counts the type byte, so a zero prefix is invalid.
pub fn decode_frame_length(header: &[u8; LENGTH_PREFIX_SIZE], max_size: usize) -> Result<usize, Error> {
    let len = u32::from_le_bytes(*header) as usize;
    if len == 0 {
        return Err(Error::InvalidMessage(
            "frame length 0 has no room for the type byte".to_string(),
        ));
    }
    let payload_len = len - 1;
    check_size(payload_len, max_size)?;
    Ok(payload_len)
}

/// Split one frame off the front of `buf`.
///
/// Returns `Ok(None)` and leaves `buf` untouched while the frame is still
/// incomplete.
pub fn decode_frame(buf: &mut BytesMut, max_size: usize) -> Result<Option<Frame>, Error> {
    if buf.len() < LENGTH_PREFIX_SIZE {
        return Ok(None);
    }

    let mut header = [0u8; LENGTH_PREFIX_SIZE];
    header.copy_from_slice(&buf[..LENGTH_PREFIX_SIZE]);
    let payload_len = decode_frame_length(&header, max_size)?;

    if buf.len() < HEADER_SIZE + payload_len {
        return Ok(None);
    }

    buf.advance(LENGTH_PREFIX_SIZE);
    let message_type = buf.get_u8();
    let payload = buf.split_to(payload_len).freeze();
    Ok(Some(Frame {
        message_type,
        payload,
    }))
}

fn check_size(payload_len: usize, max_size: usize) -> Result<(), Error> {
    if payload_len > max_size {
        return Err(Error::InvalidMessage(format!(
            "payload size {} exceeds maximum {}",
            payload_len, max_size
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_frame_empty() {
        let frame = encode_frame(1, &[]).unwrap();
        assert_eq!(frame.len(), HEADER_SIZE);
        // Length 1 covers the type byte only
        assert_eq!(&frame[..], &[1, 0, 0, 0, 1]);
    }

    #[test]
    fn test_encode_frame_small() {
        let payload = b"hello";
        let frame = encode_frame(12, payload).unwrap();

        assert_eq!(frame.len(), HEADER_SIZE + payload.len());
        assert_eq!(&frame[..4], &[6, 0, 0, 0]);
        assert_eq!(frame[4], 12);
        assert_eq!(&frame[5..], payload);
    }

    #[test]
    fn test_encode_frame_large() {
        let payload = vec![0u8; 1000];
        let frame = encode_frame(13, &payload).unwrap();

        assert_eq!(frame.len(), HEADER_SIZE + 1000);
        // 1001 = 0x3E9 in little-endian
        assert_eq!(&frame[..4], &[0xE9, 0x03, 0, 0]);
    }

    #[test]
    fn test_encode_frame_too_large() {
        let mut buf = BytesMut::new();
        let result = Frame::new(12, vec![0u8; 17]).encode_into(&mut buf, 16);
        assert!(result.is_err());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_frame_length() {
        assert_eq!(decode_frame_length(&[1, 0, 0, 0], 16).unwrap(), 0);
        assert_eq!(decode_frame_length(&[6, 0, 0, 0], 16).unwrap(), 5);
        assert_eq!(decode_frame_length(&[0xE9, 0x03, 0, 0], 1000).unwrap(), 1000);
    }

    #[test]
    fn test_decode_frame_length_invalid() {
        assert!(decode_frame_length(&[0, 0, 0, 0], 16).is_err());
        assert!(decode_frame_length(&[18, 0, 0, 0], 16).is_err());
    }

    #[test]
    fn test_decode_frame_incremental() {
        let mut wire = encode_frame(13, b"abc").unwrap();
        wire.extend_from_slice(&encode_frame(14, &[]).unwrap());

        let mut buf = BytesMut::new();
        buf.extend_from_slice(&wire[..6]);
        assert_eq!(decode_frame(&mut buf, MAX_MESSAGE_SIZE).unwrap(), None);
        assert_eq!(buf.len(), 6);

        buf.extend_from_slice(&wire[6..]);
        let first = decode_frame(&mut buf, MAX_MESSAGE_SIZE).unwrap().unwrap();
        assert_eq!(first, Frame::new(13, &b"abc"[..]));

        let second = decode_frame(&mut buf, MAX_MESSAGE_SIZE).unwrap().unwrap();
        assert_eq!(second.message_type, 14);
        assert!(second.payload.is_empty());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_frame_rejects_oversize_early() {
        let mut buf = BytesMut::from(&[0xff, 0xff, 0xff, 0x7f][..]);
        assert!(decode_frame(&mut buf, MAX_MESSAGE_SIZE).is_err());
    }

    #[test]
    fn test_roundtrip_binary() {
        let original: Vec<u8> = (0..=255).collect();
        let mut buf = encode_frame(12, &original).unwrap();
        let frame = decode_frame(&mut buf, MAX_MESSAGE_SIZE).unwrap().unwrap();
        assert_eq!(frame.payload, original);
    }
}
