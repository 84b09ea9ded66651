use mdpwire_frame::BROADCAST_CHANNEL;

use crate::error::{DecodeError, EncodeError};
use crate::layout::{Fields, Value};
use crate::record::{milli, AddressEntry, Required};
use crate::schema::{PacketKind, CHANNEL_COUNT};

/// Host-to-device command intent.
///
/// Voltages are in volts and currents in amperes; they are rounded to the
/// nearest milli-unit on encode.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum Command {
    /// Make `channel` the active channel.
    SelectChannel { channel: u8 },
    SetVoltage {
        channel: u8,
        voltage: f64,
        current: f64,
    },
    /// Same payload as [`Command::SetVoltage`]; the device applies the current.
    SetCurrent {
        channel: u8,
        voltage: f64,
        current: f64,
    },
    SetOutput { channel: u8, enabled: bool },
    SetAddress { channel: u8, entry: AddressEntry },
    /// Replace the address table; exactly one entry per channel.
    SetAllAddresses { entries: Vec<AddressEntry> },
    GetAddresses,
    GetMachine,
    Heartbeat,
    StartAutoMatch,
    StopAutoMatch,
    ResetToDfu,
    Rgb { enabled: bool },
}

impl Command {
    pub fn set_voltage(channel: u8, voltage: f64, current: f64) -> Self {
        Command::SetVoltage {
            channel,
            voltage,
            current,
        }
    }

    pub fn set_current(channel: u8, voltage: f64, current: f64) -> Self {
        Command::SetCurrent {
            channel,
            voltage,
            current,
        }
    }

    /// Build a set-address command from a caller-supplied address slice.
    pub fn set_address(channel: u8, address: &[u8], frequency_mhz: u16) -> Result<Self, EncodeError> {
        Ok(Command::SetAddress {
            channel,
            entry: AddressEntry::from_slice(address, frequency_mhz)?,
        })
    }

    pub fn kind(&self) -> PacketKind {
        match self {
            Command::SelectChannel { .. } => PacketKind::SelectChannel,
            Command::SetVoltage { .. } => PacketKind::SetVoltage,
            Command::SetCurrent { .. } => PacketKind::SetCurrent,
            Command::SetOutput { .. } => PacketKind::SetOutput,
            Command::SetAddress { .. } => PacketKind::SetAddress,
            Command::SetAllAddresses { .. } => PacketKind::SetAllAddresses,
            Command::GetAddresses => PacketKind::GetAddresses,
            Command::GetMachine => PacketKind::GetMachine,
            Command::Heartbeat => PacketKind::Heartbeat,
            Command::StartAutoMatch => PacketKind::StartAutoMatch,
            Command::StopAutoMatch => PacketKind::StopAutoMatch,
            Command::ResetToDfu => PacketKind::ResetToDfu,
            Command::Rgb { .. } => PacketKind::Rgb,
        }
    }

    /// Target channel of a per-channel command.
    pub fn channel(&self) -> Option<u8> {
        match self {
            Command::SelectChannel { channel }
            | Command::SetVoltage { channel, .. }
            | Command::SetCurrent { channel, .. }
            | Command::SetOutput { channel, .. }
            | Command::SetAddress { channel, .. } => Some(*channel),
            _ => None,
        }
    }

    /// Channel byte the frame header carries.
    pub fn header_channel(&self) -> u8 {
        self.channel().unwrap_or(BROADCAST_CHANNEL)
    }

    /// Check caller-supplied parameters.
    ///
    /// Value and frequency ranges are checked while the payload is built.
    pub fn validate(&self) -> Result<(), EncodeError> {
        if let Some(channel) = self.channel() {
            if channel as usize >= CHANNEL_COUNT {
                return Err(EncodeError::ChannelOutOfRange {
                    channel,
                    max: CHANNEL_COUNT as u8,
                });
            }
        }
        if let Command::SetAllAddresses { entries } = self {
            if entries.len() != CHANNEL_COUNT {
                return Err(EncodeError::AddressCount {
                    count: entries.len(),
                });
            }
        }
        Ok(())
    }

    pub(crate) fn to_fields(&self) -> Result<Fields, EncodeError> {
        Ok(match self {
            Command::SetVoltage {
                voltage, current, ..
            }
            | Command::SetCurrent {
                voltage, current, ..
            } => Fields::new()
                .with("voltage", milli("voltage", *voltage)?)
                .with("current", milli("current", *current)?),
            Command::SetOutput { enabled, .. } => {
                Fields::new().with("output", Value::U8((*enabled).into()))
            }
            Command::Rgb { enabled } => Fields::new().with("enabled", Value::U8((*enabled).into())),
            Command::SetAddress { entry, .. } => entry.to_fields()?,
            Command::SetAllAddresses { entries } => Fields::new().with(
                "entries",
                Value::Groups(
                    entries
                        .iter()
                        .map(AddressEntry::to_fields)
                        .collect::<Result<_, _>>()?,
                ),
            ),
            Command::SelectChannel { .. }
            | Command::GetAddresses
            | Command::GetMachine
            | Command::Heartbeat
            | Command::StartAutoMatch
            | Command::StopAutoMatch
            | Command::ResetToDfu => Fields::new(),
        })
    }

    /// Rebuild the command a frame carries. `channel` is the header byte.
    ///
    /// Returns `None` when `kind` is a report.
    pub(crate) fn from_fields(
        kind: PacketKind,
        channel: u8,
        fields: &Fields,
    ) -> Option<Result<Self, DecodeError>> {
        let fields = Required::new(kind, fields);
        let set_point = || -> Result<(f64, f64), DecodeError> {
            Ok((fields.scaled("voltage")?, fields.scaled("current")?))
        };
        let command = match kind {
            PacketKind::SelectChannel => Ok(Command::SelectChannel { channel }),
            PacketKind::SetVoltage => set_point().map(|(voltage, current)| Command::SetVoltage {
                channel,
                voltage,
                current,
            }),
            PacketKind::SetCurrent => set_point().map(|(voltage, current)| Command::SetCurrent {
                channel,
                voltage,
                current,
            }),
            PacketKind::SetOutput => fields
                .flag("output")
                .map(|enabled| Command::SetOutput { channel, enabled }),
            PacketKind::SetAddress => AddressEntry::from_fields(fields)
                .map(|entry| Command::SetAddress { channel, entry }),
            PacketKind::SetAllAddresses => fields
                .each("entries", AddressEntry::from_fields)
                .map(|entries| Command::SetAllAddresses { entries }),
            PacketKind::GetAddresses => Ok(Command::GetAddresses),
            PacketKind::GetMachine => Ok(Command::GetMachine),
            PacketKind::Heartbeat => Ok(Command::Heartbeat),
            PacketKind::StartAutoMatch => Ok(Command::StartAutoMatch),
            PacketKind::StopAutoMatch => Ok(Command::StopAutoMatch),
            PacketKind::ResetToDfu => Ok(Command::ResetToDfu),
            PacketKind::Rgb => fields
                .flag("enabled")
                .map(|enabled| Command::Rgb { enabled }),
            _ => return None,
        };
        Some(command)
    }
}
