use bytes::Bytes;
use mdpwire_frame::{parse_frame, Diagnostics, Frame, HEADER_SIZE};
use tracing::{debug, trace, warn};

use crate::command::Command;
use crate::error::DecodeError;
use crate::layout;
use crate::record::Report;
use crate::schema::PacketKind;

/// One decoded frame.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Packet {
    /// Channel byte from the header.
    pub channel: u8,
    pub message: Message,
}

impl Packet {
    /// Type code the frame carried.
    pub fn code(&self) -> u8 {
        match &self.message {
            Message::Report(report) => report.kind().code(),
            Message::Command(command) => command.kind().code(),
            Message::Unknown { code, .. } => *code,
        }
    }

    /// Known packet kind, `None` for pass-through codes.
    pub fn kind(&self) -> Option<PacketKind> {
        PacketKind::from_code(self.code())
    }
}

/// Payload of a decoded frame.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Message {
    Report(Report),
    Command(Command),
    /// A type code outside the table; the payload is passed through untouched.
    Unknown { code: u8, payload: Bytes },
}

/// Validates candidate frames and decodes them into [`Packet`]s.
#[derive(Debug, Clone, Default)]
pub struct PacketDecoder {
    diagnostics: Diagnostics,
}

impl PacketDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit decode diagnostics into `diagnostics`.
    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Validate and decode one complete frame.
    ///
    /// Any failure drops only this frame; the caller keeps reading.
    pub fn decode(&self, bytes: &[u8]) -> Result<Packet, DecodeError> {
        self.diagnostics.in_scope(|| {
            let result = parse_frame(bytes)
                .map_err(DecodeError::from)
                .and_then(|frame| decode_payload(&frame));
            if let Err(err) = &result {
                log_drop(err, bytes);
            }
            result
        })
    }

    /// Decode a frame whose magic, size and checksum were already checked.
    pub fn decode_frame(&self, frame: &Frame) -> Result<Packet, DecodeError> {
        self.diagnostics.in_scope(|| {
            let result = decode_payload(frame);
            if let Err(err) = &result {
                debug!(kind = frame.kind, error = %err, "frame dropped");
            }
            result
        })
    }
}

fn log_drop(err: &DecodeError, bytes: &[u8]) {
    let kind = bytes.get(2).copied();
    if err.is_checksum() {
        warn!(?kind, len = bytes.len(), error = %err, "checksum mismatch, frame dropped");
    } else {
        debug!(?kind, len = bytes.len(), error = %err, "malformed frame dropped");
    }
}

fn decode_payload(frame: &Frame) -> Result<Packet, DecodeError> {
    let Some(kind) = PacketKind::from_code(frame.kind) else {
        debug!(
            code = frame.kind,
            len = frame.payload.len(),
            "unknown packet type passed through"
        );
        return Ok(Packet {
            channel: frame.channel,
            message: Message::Unknown {
                code: frame.kind,
                payload: frame.payload.clone(),
            },
        });
    };

    let fields = layout::read(kind, &frame.payload, HEADER_SIZE + frame.payload.len())?;
    let message = if let Some(report) = Report::from_fields(kind, &fields) {
        Message::Report(report?)
    } else if let Some(command) = Command::from_fields(kind, frame.channel, &fields) {
        Message::Command(command?)
    } else {
        Message::Unknown {
            code: frame.kind,
            payload: frame.payload.clone(),
        }
    };
    trace!(%kind, channel = frame.channel, "packet decoded");

    Ok(Packet {
        channel: frame.channel,
        message,
    })
}
