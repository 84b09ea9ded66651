use mdpwire_frame::FrameError;

use crate::schema::PacketKind;

/// Why a candidate frame was dropped.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Magic, size byte or checksum rejected the frame.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// The frame size is not one the packet type can have.
    #[error("{kind} frame cannot be {size} bytes")]
    UnsupportedSize { kind: PacketKind, size: usize },

    /// The payload ended before the layout did.
    #[error("{kind} payload truncated at field `{field}`")]
    Truncated {
        kind: PacketKind,
        field: &'static str,
    },

    /// Bytes left over after the layout was fully read.
    #[error("{kind} payload has {extra} trailing bytes")]
    TrailingBytes { kind: PacketKind, extra: usize },

    /// A record expected a field its layout does not produce.
    #[error("{kind} layout has no field `{field}`")]
    MissingField {
        kind: PacketKind,
        field: &'static str,
    },
}

impl DecodeError {
    /// True when the frame was dropped for a bad checksum rather than a
    /// structural problem.
    pub fn is_checksum(&self) -> bool {
        matches!(self, DecodeError::Frame(err) if err.is_checksum())
    }
}

/// Command parameters rejected before any bytes were produced.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("channel {channel} out of range (0..{max})")]
    ChannelOutOfRange { channel: u8, max: u8 },

    #[error("address must be 5 bytes, got {len}")]
    AddressLength { len: usize },

    #[error("address list must have 6 entries, got {count}")]
    AddressCount { count: usize },

    #[error("{field} {value} out of range (0..={max})")]
    ValueOutOfRange {
        field: &'static str,
        value: f64,
        max: f64,
    },

    #[error("frequency {mhz} MHz out of range (2400..=2655)")]
    FrequencyOutOfRange { mhz: u16 },

    /// The values handed to the layout writer do not fit the layout.
    #[error("{kind} field `{field}` missing or of the wrong shape")]
    FieldMismatch {
        kind: PacketKind,
        field: &'static str,
    },

    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Errors surfaced by the stream adapters.
#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<FrameError> for PacketError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Io(io) => PacketError::Io(io),
            other => PacketError::Decode(DecodeError::Frame(other)),
        }
    }
}

pub type Result<T> = std::result::Result<T, PacketError>;
