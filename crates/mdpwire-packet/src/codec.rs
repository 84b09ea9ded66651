use bytes::BytesMut;
use mdpwire_frame::{AssemblerConfig, Diagnostics, FrameCodec};
use tokio_util::codec::{Decoder, Encoder};

use crate::command::Command;
use crate::decode::{Packet, PacketDecoder};
use crate::encode::PacketEncoder;
use crate::error::{DecodeError, PacketError};

/// `tokio_util` codec for a serial link to the device.
///
/// Each item is one frame's decode result. A dropped frame is reported as
/// `Some(Err(_))` without ending the stream; only I/O failures do that.
#[derive(Debug, Clone, Default)]
pub struct PacketCodec {
    frames: FrameCodec,
    decoder: PacketDecoder,
    encoder: PacketEncoder,
}

impl PacketCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AssemblerConfig) -> Self {
        Self {
            frames: FrameCodec::with_config(config),
            ..Self::default()
        }
    }

    /// Emit assembler, decoder and encoder diagnostics into `diagnostics`.
    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.frames = self.frames.with_diagnostics(diagnostics.clone());
        self.decoder = self.decoder.with_diagnostics(diagnostics.clone());
        self.encoder = self.encoder.with_diagnostics(diagnostics);
        self
    }
}

impl Decoder for PacketCodec {
    type Item = Result<Packet, DecodeError>;
    type Error = PacketError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        Ok(self
            .frames
            .decode(src)?
            .map(|candidate| self.decoder.decode(&candidate)))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        Ok(self
            .frames
            .decode_eof(src)?
            .map(|candidate| self.decoder.decode(&candidate)))
    }
}

impl Encoder<Command> for PacketCodec {
    type Error = PacketError;

    fn encode(&mut self, command: Command, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.encoder.encode_into(&command, dst)?;
        Ok(())
    }
}
