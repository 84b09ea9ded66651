use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Frame header: magic (2) + type (1) + size (1) + channel (1) + checksum (1) = 6 bytes.
pub const HEADER_SIZE: usize = 6;

/// Magic bytes: 0x5A 0x5A.
pub const MAGIC: [u8; 2] = [0x5A, 0x5A];

/// Channel byte used by packets that are not addressed to one channel.
pub const BROADCAST_CHANNEL: u8 = 0xEE;

/// The size byte counts the whole frame, so a frame never exceeds 255 bytes.
pub const MAX_FRAME_SIZE: usize = u8::MAX as usize;

/// Largest payload that fits behind the header.
pub const MAX_PAYLOAD: usize = MAX_FRAME_SIZE - HEADER_SIZE;

pub(crate) const TYPE_INDEX: usize = 2;
pub(crate) const SIZE_INDEX: usize = 3;
const CHANNEL_INDEX: usize = 4;
const CHECKSUM_INDEX: usize = 5;

/// XOR-reduction over a payload.
///
/// Only payload bytes take part; the header (channel included) never does.
pub fn checksum(payload: &[u8]) -> u8 {
    payload.iter().fold(0, |acc, b| acc ^ b)
}

/// One validated frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Packet type code.
    pub kind: u8,
    /// Channel byte from the header.
    pub channel: u8,
    /// Payload bytes (everything after the header).
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(kind: u8, channel: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            kind,
            channel,
            payload: payload.into(),
        }
    }

    /// The total wire size of this frame (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// Checksum the header will carry for this payload.
    pub fn checksum(&self) -> u8 {
        checksum(&self.payload)
    }

    /// Encode into a fresh buffer.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut dst = BytesMut::with_capacity(self.wire_size());
        encode_frame(self.kind, self.channel, &self.payload, &mut dst)?;
        Ok(dst.freeze())
    }
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────────┬──────┬──────┬─────────┬──────────┬──────────────┐
/// │ Magic (2B) │ Type │ Size │ Channel │ Checksum │ Payload      │
/// │ 0x5A 0x5A  │ (1B) │ (1B) │ (1B)    │ (1B)     │ (Size-6 B)   │
/// └────────────┴──────┴──────┴─────────┴──────────┴──────────────┘
/// ```
pub fn encode_frame(kind: u8, channel: u8, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        });
    }
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_slice(&MAGIC);
    dst.put_u8(kind);
    dst.put_u8((HEADER_SIZE + payload.len()) as u8);
    dst.put_u8(channel);
    dst.put_u8(checksum(payload));
    dst.put_slice(payload);
    Ok(())
}

/// Validate one complete frame and split it into header fields and payload.
///
/// Checks, in order: magic, header length, size byte against the actual
/// length, then the checksum. Nothing is truncated or padded.
pub fn parse_frame(bytes: &[u8]) -> Result<Frame> {
    if bytes.len() >= MAGIC.len() && bytes[..MAGIC.len()] != MAGIC {
        return Err(FrameError::InvalidMagic);
    }
    if bytes.len() < HEADER_SIZE {
        return Err(FrameError::TooShort { len: bytes.len() });
    }

    let declared = bytes[SIZE_INDEX];
    if declared as usize != bytes.len() {
        return Err(FrameError::SizeMismatch {
            declared,
            actual: bytes.len(),
        });
    }

    let payload = &bytes[HEADER_SIZE..];
    let stored = bytes[CHECKSUM_INDEX];
    let computed = checksum(payload);
    if stored != computed {
        return Err(FrameError::ChecksumMismatch { stored, computed });
    }

    Ok(Frame {
        kind: bytes[TYPE_INDEX],
        channel: bytes[CHANNEL_INDEX],
        payload: Bytes::copy_from_slice(payload),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_set_voltage_frame() {
        let mut buf = BytesMut::new();
        // 3300 mV, 500 mA
        encode_frame(0x1A, 0, &[0xE4, 0x0C, 0xF4, 0x01], &mut buf).unwrap();

        assert_eq!(
            buf.as_ref(),
            &[0x5A, 0x5A, 0x1A, 0x0A, 0x00, 0x1D, 0xE4, 0x0C, 0xF4, 0x01]
        );
    }

    #[test]
    fn test_encode_parse_roundtrip() {
        let mut buf = BytesMut::new();
        encode_frame(0x18, 3, &[1, 2, 3, 4, 5, 40], &mut buf).unwrap();

        let frame = parse_frame(&buf).unwrap();
        assert_eq!(frame.kind, 0x18);
        assert_eq!(frame.channel, 3);
        assert_eq!(frame.payload.as_ref(), &[1, 2, 3, 4, 5, 40]);
        assert_eq!(frame.wire_size(), buf.len());
    }

    #[test]
    fn test_parse_empty_payload() {
        let frame = parse_frame(&[0x5A, 0x5A, 0x22, 0x06, 0xEE, 0x00]).unwrap();
        assert_eq!(frame.kind, 0x22);
        assert_eq!(frame.channel, BROADCAST_CHANNEL);
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn test_parse_invalid_magic() {
        let result = parse_frame(&[0xFF, 0xFF, 0x22, 0x06, 0xEE, 0x00]);
        assert!(matches!(result, Err(FrameError::InvalidMagic)));
    }

    #[test]
    fn test_parse_too_short() {
        let result = parse_frame(&[0x5A, 0x5A, 0x22, 0x06]);
        assert!(matches!(result, Err(FrameError::TooShort { len: 4 })));
    }

    #[test]
    fn test_parse_size_mismatch() {
        let mut buf = BytesMut::new();
        encode_frame(0x14, 0, &[2], &mut buf).unwrap();

        let longer = [buf.as_ref(), &[0x00]].concat();
        let result = parse_frame(&longer);
        assert!(matches!(
            result,
            Err(FrameError::SizeMismatch {
                declared: 7,
                actual: 8
            })
        ));

        let result = parse_frame(&buf[..6]);
        assert!(matches!(result, Err(FrameError::SizeMismatch { .. })));
    }

    #[test]
    fn test_every_payload_bit_flip_is_caught() {
        let mut buf = BytesMut::new();
        let payload: Vec<u8> = (0u8..36).map(|b| b.wrapping_mul(37)).collect();
        encode_frame(0x1C, BROADCAST_CHANNEL, &payload, &mut buf).unwrap();

        for byte in HEADER_SIZE..buf.len() {
            for bit in 0..8 {
                let mut corrupted = buf.to_vec();
                corrupted[byte] ^= 1 << bit;
                let err = parse_frame(&corrupted).unwrap_err();
                assert!(err.is_checksum(), "byte {byte} bit {bit}: {err}");
            }
        }
    }

    #[test]
    fn test_payload_too_large() {
        let mut buf = BytesMut::new();
        let result = encode_frame(0x11, 0, &[0u8; MAX_PAYLOAD + 1], &mut buf);
        assert!(matches!(result, Err(FrameError::PayloadTooLarge { .. })));
        assert!(buf.is_empty());

        encode_frame(0x11, 0, &[0u8; MAX_PAYLOAD], &mut buf).unwrap();
        assert_eq!(buf.len(), MAX_FRAME_SIZE);
    }

    #[test]
    fn test_frame_to_bytes() {
        let frame = Frame::new(0x20, BROADCAST_CHANNEL, vec![1u8]);
        assert_eq!(frame.checksum(), 1);
        assert_eq!(
            frame.to_bytes().unwrap().as_ref(),
            &[0x5A, 0x5A, 0x20, 0x07, 0xEE, 0x01, 0x01]
        );
    }
}
