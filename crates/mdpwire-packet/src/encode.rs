use bytes::{Bytes, BytesMut};
use mdpwire_frame::{encode_frame, Diagnostics, MAX_FRAME_SIZE, MAX_PAYLOAD};
use tracing::{debug, trace};

use crate::command::Command;
use crate::decode::{Message, Packet};
use crate::error::EncodeError;
use crate::layout::{self, Fields};
use crate::record::Report;
use crate::schema::PacketKind;

/// Builds outbound frames from command intents.
///
/// Invalid parameters are rejected before any byte is written.
#[derive(Debug, Clone, Default)]
pub struct PacketEncoder {
    diagnostics: Diagnostics,
}

impl PacketEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit encode diagnostics into `diagnostics`.
    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Encode a command into a fresh frame.
    pub fn encode(&self, command: &Command) -> Result<Bytes, EncodeError> {
        let mut dst = BytesMut::with_capacity(MAX_FRAME_SIZE);
        self.encode_into(command, &mut dst)?;
        Ok(dst.freeze())
    }

    /// Append the frame for `command` to `dst`.
    ///
    /// On error `dst` is left as it was.
    pub fn encode_into(&self, command: &Command, dst: &mut BytesMut) -> Result<(), EncodeError> {
        self.diagnostics.in_scope(|| {
            let result = command.validate().and_then(|()| {
                let fields = command.to_fields()?;
                write_frame(command.kind(), command.header_channel(), &fields, dst)
            });
            if let Err(err) = &result {
                debug!(kind = %command.kind(), error = %err, "command rejected");
            }
            result
        })
    }

    /// Encode a report, as a device would send it.
    pub fn encode_report(&self, channel: u8, report: &Report) -> Result<Bytes, EncodeError> {
        let mut dst = BytesMut::with_capacity(MAX_FRAME_SIZE);
        self.diagnostics.in_scope(|| {
            let fields = report.to_fields()?;
            write_frame(report.kind(), channel, &fields, &mut dst)
        })?;
        Ok(dst.freeze())
    }

    /// Encode any decoded packet back into a frame.
    ///
    /// Commands take their header channel from the command itself; reports
    /// and pass-through packets use `packet.channel`.
    pub fn encode_packet(&self, packet: &Packet) -> Result<Bytes, EncodeError> {
        match &packet.message {
            Message::Report(report) => self.encode_report(packet.channel, report),
            Message::Command(command) => self.encode(command),
            Message::Unknown { code, payload } => {
                let mut dst = BytesMut::with_capacity(MAX_FRAME_SIZE);
                encode_frame(*code, packet.channel, payload, &mut dst)?;
                Ok(dst.freeze())
            }
        }
    }
}

fn write_frame(
    kind: PacketKind,
    channel: u8,
    fields: &Fields,
    dst: &mut BytesMut,
) -> Result<(), EncodeError> {
    let mut payload = BytesMut::with_capacity(MAX_PAYLOAD);
    layout::write(kind, fields, &mut payload)?;
    encode_frame(kind.code(), channel, &payload, dst)?;
    trace!(%kind, channel, size = payload.len() + mdpwire_frame::HEADER_SIZE, "frame encoded");
    Ok(())
}
