//! Frame assembly for the Miniware MDP serial protocol.
//!
//! Every packet on the wire is framed as:
//! - A 2-byte magic number (`0x5A 0x5A`) for stream synchronization
//! - A 1-byte packet type and a 1-byte total frame size
//! - A 1-byte channel (`0xEE` when the packet is not per-channel)
//! - A 1-byte XOR checksum over the payload
//!
//! The serial link delivers bytes in arbitrary chunks and may interleave
//! noise. [`FrameAssembler`] turns that stream into candidate frames;
//! [`parse_frame`] validates one candidate.

pub mod assembler;
#[cfg(feature = "async")]
pub mod codec;
pub mod diagnostics;
pub mod error;
pub mod frame;
pub mod reader;
pub mod units;
pub mod writer;

pub use assembler::{AssemblerConfig, FrameAssembler, DEFAULT_DISCARD_BOUND};
#[cfg(feature = "async")]
pub use codec::FrameCodec;
pub use diagnostics::Diagnostics;
pub use error::{FrameError, Result};
pub use frame::{
    checksum, encode_frame, parse_frame, Frame, BROADCAST_CHANNEL, HEADER_SIZE, MAGIC,
    MAX_FRAME_SIZE, MAX_PAYLOAD,
};
pub use reader::FrameReader;
pub use writer::FrameWriter;
