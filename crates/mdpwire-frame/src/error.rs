/// Errors that can occur during frame encoding/validation.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame does not start with the magic number.
    #[error("invalid frame magic (expected 0x5A 0x5A)")]
    InvalidMagic,

    /// The frame is shorter than the fixed header.
    #[error("frame too short ({len} bytes, header is 6)")]
    TooShort { len: usize },

    /// The size byte disagrees with the actual frame length.
    #[error("frame size mismatch (size byte {declared}, actual {actual} bytes)")]
    SizeMismatch { declared: u8, actual: usize },

    /// The XOR over the payload does not match the checksum byte.
    #[error("checksum mismatch (stored 0x{stored:02X}, computed 0x{computed:02X})")]
    ChecksumMismatch { stored: u8, computed: u8 },

    /// The payload does not fit in a frame whose size is a single byte.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

impl FrameError {
    /// True for checksum failures, false for structural ones.
    ///
    /// Both mean "drop this frame"; the distinction is for diagnostics.
    pub fn is_checksum(&self) -> bool {
        matches!(self, FrameError::ChecksumMismatch { .. })
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
