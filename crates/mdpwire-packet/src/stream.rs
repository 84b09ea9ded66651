use std::io::{Read, Write};

use mdpwire_frame::{AssemblerConfig, Diagnostics, FrameError, FrameReader, FrameWriter};

use crate::command::Command;
use crate::decode::{Packet, PacketDecoder};
use crate::encode::PacketEncoder;
use crate::error::{PacketError, Result};
use crate::record::Report;

/// Reads decoded packets from a blocking byte stream such as a serial port.
pub struct PacketReader<R> {
    frames: FrameReader<R>,
    decoder: PacketDecoder,
}

impl<R: Read> PacketReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_config(inner, AssemblerConfig::default())
    }

    pub fn with_config(inner: R, config: AssemblerConfig) -> Self {
        Self {
            frames: FrameReader::with_config(inner, config),
            decoder: PacketDecoder::new(),
        }
    }

    /// Emit assembler and decoder diagnostics into `diagnostics`.
    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.frames = self.frames.with_diagnostics(diagnostics.clone());
        self.decoder = self.decoder.with_diagnostics(diagnostics);
        self
    }

    /// Read and decode the next frame.
    ///
    /// A [`PacketError::Decode`] drops only that frame; the next call
    /// resumes with the following one. EOF surfaces as
    /// `FrameError::ConnectionClosed` wrapped in [`PacketError::Decode`].
    pub fn read_packet(&mut self) -> Result<Packet> {
        let candidate = self.frames.read_frame()?;
        Ok(self.decoder.decode(&candidate)?)
    }

    /// Bytes buffered but not yet part of a complete frame.
    pub fn pending(&self) -> usize {
        self.frames.pending()
    }

    pub fn get_ref(&self) -> &R {
        self.frames.get_ref()
    }

    pub fn get_mut(&mut self) -> &mut R {
        self.frames.get_mut()
    }

    pub fn into_inner(self) -> R {
        self.frames.into_inner()
    }
}

impl<R: Read> Iterator for PacketReader<R> {
    type Item = Result<Packet>;

    /// Yields packets and per-frame errors; EOF ends the iteration.
    fn next(&mut self) -> Option<Self::Item> {
        let candidate = match self.frames.read_frame() {
            Ok(candidate) => candidate,
            Err(FrameError::ConnectionClosed) => return None,
            Err(err) => return Some(Err(err.into())),
        };
        Some(self.decoder.decode(&candidate).map_err(PacketError::from))
    }
}

/// Encodes commands and reports onto a blocking byte stream.
pub struct PacketWriter<W> {
    frames: FrameWriter<W>,
    encoder: PacketEncoder,
}

impl<W: Write> PacketWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            frames: FrameWriter::new(inner),
            encoder: PacketEncoder::new(),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.encoder = self.encoder.with_diagnostics(diagnostics);
        self
    }

    /// Encode and send one command. Nothing is written if it is rejected.
    pub fn send(&mut self, command: &Command) -> Result<()> {
        let bytes = self.encoder.encode(command)?;
        self.frames.write_raw(&bytes)?;
        Ok(())
    }

    /// Encode and send a report on `channel`.
    pub fn send_report(&mut self, channel: u8, report: &Report) -> Result<()> {
        let bytes = self.encoder.encode_report(channel, report)?;
        self.frames.write_raw(&bytes)?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        self.frames.get_ref()
    }

    pub fn get_mut(&mut self) -> &mut W {
        self.frames.get_mut()
    }

    pub fn into_inner(self) -> W {
        self.frames.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::decode::Message;
    use crate::error::{DecodeError, EncodeError};

    #[test]
    fn test_write_then_read_commands() {
        let mut writer = PacketWriter::new(Vec::new());
        writer.send(&Command::Heartbeat).unwrap();
        writer.send(&Command::set_voltage(2, 5.0, 1.0)).unwrap();
        writer.send(&Command::Rgb { enabled: true }).unwrap();

        let reader = PacketReader::new(Cursor::new(writer.into_inner()));
        let messages: Vec<Message> = reader.map(|p| p.unwrap().message).collect();

        assert_eq!(
            messages,
            vec![
                Message::Command(Command::Heartbeat),
                Message::Command(Command::set_voltage(2, 5.0, 1.0)),
                Message::Command(Command::Rgb { enabled: true }),
            ]
        );
    }

    #[test]
    fn test_bad_frame_does_not_stop_the_stream() {
        let mut bytes = vec![0x5A, 0x5A, 0x20, 0x07, 0xEE, 0x00, 0x01];
        bytes.extend_from_slice(&[0x5A, 0x5A, 0x14, 0x07, 0xEE, 0x02, 0x02]);

        let mut reader = PacketReader::new(Cursor::new(bytes));

        let err = reader.read_packet().unwrap_err();
        assert!(matches!(err, PacketError::Decode(ref e) if e.is_checksum()));

        let packet = reader.read_packet().unwrap();
        assert_eq!(
            packet.message,
            Message::Report(Report::ChannelSwitch { channel: 2 })
        );

        let err = reader.read_packet().unwrap_err();
        assert!(matches!(
            err,
            PacketError::Decode(DecodeError::Frame(FrameError::ConnectionClosed))
        ));
    }

    #[test]
    fn test_rejected_command_writes_nothing() {
        let mut writer = PacketWriter::new(Vec::new());
        let err = writer.send(&Command::set_voltage(9, 1.0, 1.0)).unwrap_err();

        assert!(matches!(
            err,
            PacketError::Encode(EncodeError::ChannelOutOfRange { channel: 9, .. })
        ));
        assert!(writer.get_ref().is_empty());
    }

    #[test]
    fn test_send_report() {
        let mut writer = PacketWriter::new(Vec::new());
        writer
            .send_report(0xEE, &Report::ChannelSwitch { channel: 1 })
            .unwrap();
        assert_eq!(
            writer.get_ref().as_slice(),
            &[0x5A, 0x5A, 0x14, 0x07, 0xEE, 0x01, 0x01]
        );
    }

    #[test]
    fn test_pending_tracks_partial_frame() {
        let bytes = vec![0x5A, 0x5A, 0x22, 0x06, 0xEE, 0x00, 0x5A, 0x5A, 0x14];
        let mut reader = PacketReader::new(Cursor::new(bytes));

        reader.read_packet().unwrap();
        assert_eq!(reader.pending(), 3);
        assert!(reader.next().is_none());
    }
}
