use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::kind::FrameKind;

/// Frame header: magic (2) + length (4) + kind (2) = 8 bytes.
pub const HEADER_SIZE: usize = 8;

/// Magic bytes: "LN" (0x4C 0x4E).
pub const MAGIC: [u8; 2] = [0x4C, 0x4E];

/// Default maximum payload size: 4 KiB, one default-length line.
pub const DEFAULT_MAX_PAYLOAD: usize = 4 * 1024;

/// One message on the line transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// What this frame carries.
    pub kind: FrameKind,
    /// Line bytes; empty for end-of-stream.
    pub payload: Bytes,
}

impl Frame {
    /// A frame carrying one line.
    pub fn line(payload: impl Into<Bytes>) -> Self {
        Self {
            kind: FrameKind::Line,
            payload: payload.into(),
        }
    }

    /// The end-of-stream marker.
    pub fn end_of_stream() -> Self {
        Self {
            kind: FrameKind::EndOfStream,
            payload: Bytes::new(),
        }
    }

    pub fn is_end_of_stream(&self) -> bool {
        self.kind == FrameKind::EndOfStream
    }
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬───────────┬──────────┬─────────────────┐
/// │ Magic (2B)   │ Length    │ Kind     │ Payload          │
/// │ 0x4C 0x4E    │ (4B LE)  │ (2B LE)  │ (Length bytes)   │
/// │ "LN"         │          │          │                  │
/// └──────────────┴───────────┴──────────┴─────────────────┘
/// ```
pub fn encode_frame(kind: FrameKind, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > u32::MAX as usize {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: u32::MAX as usize,
        });
    }
    if kind == FrameKind::EndOfStream && !payload.is_empty() {
        return Err(FrameError::UnexpectedPayload(payload.len()));
    }
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_slice(&MAGIC);
    dst.put_u32_le(payload.len() as u32);
    dst.put_u16_le(kind.code());
    dst.put_slice(payload);
    Ok(())
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Frame>> {
    if src.len() < HEADER_SIZE {
        return Ok(None);
    }

    if src[0..2] != MAGIC {
        return Err(FrameError::InvalidMagic);
    }

    let payload_len = u32::from_le_bytes([src[2], src[3], src[4], src[5]]) as usize;
    let kind = FrameKind::from_code(u16::from_le_bytes([src[6], src[7]]))?;

    if kind == FrameKind::EndOfStream && payload_len != 0 {
        return Err(FrameError::UnexpectedPayload(payload_len));
    }
    if payload_len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    let total = HEADER_SIZE + payload_len;
    if src.len() < total {
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    let payload = src.split_to(payload_len).freeze();

    Ok(Some(Frame { kind, payload }))
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 4 KiB.
    pub max_payload_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_line() {
        let mut buf = BytesMut::new();
        encode_frame(FrameKind::Line, b"end_header\n", &mut buf).unwrap();
        assert_eq!(buf.len(), HEADER_SIZE + 11);

        let frame = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .unwrap();
        assert_eq!(frame, Frame::line(&b"end_header\n"[..]));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_end_of_stream_has_empty_payload() {
        let mut buf = BytesMut::new();
        encode_frame(FrameKind::EndOfStream, b"", &mut buf).unwrap();
        assert_eq!(buf.len(), HEADER_SIZE);

        let frame = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .unwrap();
        assert!(frame.is_end_of_stream());
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn test_encode_rejects_end_of_stream_payload() {
        let mut buf = BytesMut::new();
        let result = encode_frame(FrameKind::EndOfStream, b"x", &mut buf);
        assert!(matches!(result, Err(FrameError::UnexpectedPayload(1))));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_rejects_end_of_stream_payload() {
        let mut buf = BytesMut::new();
        buf.put_slice(&MAGIC);
        buf.put_u32_le(3);
        buf.put_u16_le(FrameKind::EndOfStream.code());
        buf.put_slice(b"abc");

        let result = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD);
        assert!(matches!(result, Err(FrameError::UnexpectedPayload(3))));
    }

    #[test]
    fn test_decode_incomplete_header() {
        let mut buf = BytesMut::from(&[0x4C, 0x4E, 0x00][..]);
        assert!(decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_decode_incomplete_payload() {
        let mut buf = BytesMut::new();
        encode_frame(FrameKind::Line, b"hello\n", &mut buf).unwrap();
        buf.truncate(HEADER_SIZE + 2);

        assert!(decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_decode_invalid_magic() {
        let mut buf = BytesMut::from(&[0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00][..]);
        let result = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD);
        assert!(matches!(result, Err(FrameError::InvalidMagic)));
    }

    #[test]
    fn test_decode_unknown_kind() {
        let mut buf = BytesMut::new();
        buf.put_slice(&MAGIC);
        buf.put_u32_le(0);
        buf.put_u16_le(42);

        let result = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD);
        assert!(matches!(result, Err(FrameError::UnknownKind(42))));
    }

    #[test]
    fn test_decode_payload_too_large() {
        let mut buf = BytesMut::new();
        buf.put_slice(&MAGIC);
        buf.put_u32_le(64 * 1024);
        buf.put_u16_le(FrameKind::Line.code());

        let result = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD);
        assert!(matches!(
            result,
            Err(FrameError::PayloadTooLarge { size: 65536, max: 4096 })
        ));
    }

    #[test]
    fn test_empty_line_frame() {
        let mut buf = BytesMut::new();
        encode_frame(FrameKind::Line, b"", &mut buf).unwrap();

        let frame = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .unwrap();
        assert_eq!(frame.kind, FrameKind::Line);
        assert!(frame.payload.is_empty());
    }
}
