//! Packet layer for the Miniware MDP serial protocol.
//!
//! Frames from [`mdpwire_frame`] carry one of nineteen packet types. Each type
//! has a declarative payload layout in [`schema`]; the generic reader and
//! writer in [`layout`] walk those tables, and [`record`] and [`command`]
//! turn the resulting fields into typed values in volts, amperes and MHz.
//!
//! ```
//! use mdpwire_packet::{Command, Message, PacketDecoder, PacketEncoder};
//!
//! let bytes = PacketEncoder::new()
//!     .encode(&Command::set_voltage(0, 3.3, 0.5))
//!     .unwrap();
//! assert_eq!(
//!     bytes.as_ref(),
//!     &[0x5A, 0x5A, 0x1A, 0x0A, 0x00, 0x1D, 0xE4, 0x0C, 0xF4, 0x01]
//! );
//!
//! let packet = PacketDecoder::new().decode(&bytes).unwrap();
//! assert_eq!(
//!     packet.message,
//!     Message::Command(Command::set_voltage(0, 3.3, 0.5))
//! );
//! ```
//!
//! Decoding never aborts a stream: a frame that fails validation is dropped
//! with a [`DecodeError`] and the next frame is read as usual.

#[cfg(feature = "async")]
pub mod codec;
pub mod command;
pub mod decode;
pub mod encode;
pub mod error;
pub mod layout;
pub mod record;
pub mod schema;
pub mod stream;

#[cfg(feature = "async")]
pub use codec::PacketCodec;
pub use command::Command;
pub use decode::{Message, Packet, PacketDecoder};
pub use encode::PacketEncoder;
pub use error::{DecodeError, EncodeError, PacketError, Result};
pub use record::{
    AddressEntry, ChannelStatus, DeviceInfo, DeviceKind, LoadStatus, MachineKind, OperatingMode,
    PsuStatus, Reading, Report, Rgb, StatusCode, Synthesize, Wave, WaveGroup, WaveSample,
};
pub use schema::{Direction, PacketKind};
pub use stream::{PacketReader, PacketWriter};

pub use mdpwire_frame::{
    AssemblerConfig, Diagnostics, Frame, FrameAssembler, FrameError, BROADCAST_CHANNEL,
};
