//! Typed report records.
//!
//! Derived values (operating mode, colour, display variant) are computed
//! when a record is built from its fields, not on access.

use mdpwire_frame::units;

use crate::error::{DecodeError, EncodeError};
use crate::layout::{Fields, Value};
use crate::schema::{PacketKind, MACHINE_L1060};

/// Product variant occupying a channel slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MachineKind {
    /// Empty slot.
    Node,
    P905,
    P906,
    /// Electronic load.
    L1060,
    Unknown(u8),
}

impl MachineKind {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => MachineKind::Node,
            1 => MachineKind::P905,
            2 => MachineKind::P906,
            MACHINE_L1060 => MachineKind::L1060,
            other => MachineKind::Unknown(other),
        }
    }

    pub fn raw(self) -> u8 {
        match self {
            MachineKind::Node => 0,
            MachineKind::P905 => 1,
            MachineKind::P906 => 2,
            MachineKind::L1060 => MACHINE_L1060,
            MachineKind::Unknown(raw) => raw,
        }
    }

    pub fn is_load(self) -> bool {
        self == MachineKind::L1060
    }
}

/// Regulation mode reported by an electronic load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum LoadStatus {
    ConstantCurrent,
    ConstantVoltage,
    ConstantResistance,
    ConstantPower,
    Unknown(u8),
}

impl LoadStatus {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => LoadStatus::ConstantCurrent,
            1 => LoadStatus::ConstantVoltage,
            2 => LoadStatus::ConstantResistance,
            3 => LoadStatus::ConstantPower,
            other => LoadStatus::Unknown(other),
        }
    }

    pub fn raw(self) -> u8 {
        match self {
            LoadStatus::ConstantCurrent => 0,
            LoadStatus::ConstantVoltage => 1,
            LoadStatus::ConstantResistance => 2,
            LoadStatus::ConstantPower => 3,
            LoadStatus::Unknown(raw) => raw,
        }
    }
}

/// State reported by a power supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PsuStatus {
    Off,
    ConstantCurrent,
    ConstantVoltage,
    On,
    Unknown(u8),
}

impl PsuStatus {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => PsuStatus::Off,
            1 => PsuStatus::ConstantCurrent,
            2 => PsuStatus::ConstantVoltage,
            3 => PsuStatus::On,
            other => PsuStatus::Unknown(other),
        }
    }

    pub fn raw(self) -> u8 {
        match self {
            PsuStatus::Off => 0,
            PsuStatus::ConstantCurrent => 1,
            PsuStatus::ConstantVoltage => 2,
            PsuStatus::On => 3,
            PsuStatus::Unknown(raw) => raw,
        }
    }
}

/// The status byte of a channel record; which one is present depends on
/// the machine type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StatusCode {
    Load(LoadStatus),
    Psu(PsuStatus),
}

/// What a channel is doing, merged across loads and supplies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum OperatingMode {
    Off,
    On,
    ConstantCurrent,
    ConstantVoltage,
    ConstantResistance,
    ConstantPower,
}

impl OperatingMode {
    /// Loads with their output off are `Off` whatever their status says.
    /// Unknown codes resolve to `Off`.
    pub fn resolve(status: StatusCode, output_on: bool) -> Self {
        match status {
            StatusCode::Load(_) if !output_on => OperatingMode::Off,
            StatusCode::Load(LoadStatus::ConstantCurrent) => OperatingMode::ConstantCurrent,
            StatusCode::Load(LoadStatus::ConstantVoltage) => OperatingMode::ConstantVoltage,
            StatusCode::Load(LoadStatus::ConstantResistance) => OperatingMode::ConstantResistance,
            StatusCode::Load(LoadStatus::ConstantPower) => OperatingMode::ConstantPower,
            StatusCode::Psu(PsuStatus::ConstantCurrent) => OperatingMode::ConstantCurrent,
            StatusCode::Psu(PsuStatus::ConstantVoltage) => OperatingMode::ConstantVoltage,
            StatusCode::Psu(PsuStatus::On) => OperatingMode::On,
            StatusCode::Psu(PsuStatus::Off)
            | StatusCode::Psu(PsuStatus::Unknown(_))
            | StatusCode::Load(LoadStatus::Unknown(_)) => OperatingMode::Off,
        }
    }
}

/// 8-bit colour expanded from RGB565.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn from_rgb565(value: u16) -> Self {
        Self {
            r: ((value & 0xF800) >> 8) as u8,
            g: ((value & 0x07E0) >> 3) as u8,
            b: ((value & 0x001F) << 3) as u8,
        }
    }
}

/// Voltage (V) and current (A) pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Reading {
    pub voltage: f64,
    pub current: f64,
}

impl Reading {
    /// Watts.
    pub fn power(&self) -> f64 {
        self.voltage * self.current
    }
}

/// One channel slot of a synthesize report.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ChannelStatus {
    pub num: u8,
    pub machine: MachineKind,
    pub online: bool,
    pub output_on: bool,
    pub locked: bool,
    pub error: bool,
    pub status: StatusCode,
    pub mode: OperatingMode,
    pub output: Reading,
    pub input: Reading,
    pub target: Reading,
    /// Degrees Celsius.
    pub temperature: f64,
    /// Colour bytes as received; `color` is derived from the first two.
    pub color_raw: [u8; 3],
    pub color: Rgb,
    pub reserved: u8,
}

impl ChannelStatus {
    pub fn output_power(&self) -> f64 {
        self.output.power()
    }

    pub fn input_power(&self) -> f64 {
        self.input.power()
    }

    fn from_fields(fields: Required<'_>) -> Result<Self, DecodeError> {
        let machine = MachineKind::from_raw(fields.u8("machine_type")?);
        // The layout reads exactly one of the two status fields.
        let status = if fields.inner.contains("status_load") {
            StatusCode::Load(LoadStatus::from_raw(fields.u8("status_load")?))
        } else {
            StatusCode::Psu(PsuStatus::from_raw(fields.u8("status_psu")?))
        };
        let output_on = fields.flag("output_on")?;
        let color_raw: [u8; 3] = fields
            .bytes("color")?
            .try_into()
            .map_err(|_| fields.missing("color"))?;

        Ok(Self {
            num: fields.u8("num")?,
            machine,
            online: fields.flag("online")?,
            output_on,
            locked: fields.flag("lock")?,
            error: fields.flag("error")?,
            status,
            mode: OperatingMode::resolve(status, output_on),
            output: fields.reading("out_voltage", "out_current")?,
            input: fields.reading("in_voltage", "in_current")?,
            target: fields.reading("set_voltage", "set_current")?,
            temperature: fields.scaled("temperature")?,
            color: Rgb::from_rgb565(u16::from_le_bytes([color_raw[0], color_raw[1]])),
            color_raw,
            reserved: fields.u8("end")?,
        })
    }

    fn to_fields(&self) -> Result<Fields, EncodeError> {
        let mut fields = Fields::new()
            .with("num", Value::U8(self.num))
            .with("out_voltage", milli("out_voltage", self.output.voltage)?)
            .with("out_current", milli("out_current", self.output.current)?)
            .with("in_voltage", milli("in_voltage", self.input.voltage)?)
            .with("in_current", milli("in_current", self.input.current)?)
            .with("set_voltage", milli("set_voltage", self.target.voltage)?)
            .with("set_current", milli("set_current", self.target.current)?)
            .with("temperature", deci("temperature", self.temperature)?)
            .with("online", Value::U8(self.online.into()))
            .with("machine_type", Value::U8(self.machine.raw()))
            .with("lock", Value::U8(self.locked.into()));
        match self.status {
            StatusCode::Load(status) => fields.insert("status_load", Value::U8(status.raw())),
            StatusCode::Psu(status) => fields.insert("status_psu", Value::U8(status.raw())),
        }
        Ok(fields
            .with("output_on", Value::U8(self.output_on.into()))
            .with("color", Value::Bytes(self.color_raw.to_vec()))
            .with("error", Value::U8(self.error.into()))
            .with("end", Value::U8(self.reserved)))
    }
}

/// Periodic snapshot of all channels.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Synthesize {
    pub channels: Vec<ChannelStatus>,
}

impl Synthesize {
    pub fn any_error(&self) -> bool {
        self.channels.iter().any(|channel| channel.error)
    }

    pub fn online_channels(&self) -> impl Iterator<Item = &ChannelStatus> {
        self.channels.iter().filter(|channel| channel.online)
    }

    pub fn channel(&self, index: usize) -> Option<&ChannelStatus> {
        self.channels.get(index)
    }
}

/// One voltage/current sample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct WaveSample {
    pub voltage: f64,
    pub current: f64,
}

/// Samples sharing one timestamp.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct WaveGroup {
    pub timestamp: u32,
    pub samples: Vec<WaveSample>,
}

/// Waveform block for the channel named in the frame header.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Wave {
    pub groups: Vec<WaveGroup>,
}

impl Wave {
    /// Samples per group (2 or 4, set by the frame size).
    pub fn samples_per_group(&self) -> usize {
        self.groups.first().map_or(0, |group| group.samples.len())
    }

    /// Every sample with its group timestamp, in wire order.
    pub fn samples(&self) -> impl Iterator<Item = (u32, &WaveSample)> {
        self.groups
            .iter()
            .flat_map(|group| group.samples.iter().map(move |s| (group.timestamp, s)))
    }
}

/// A radio address and the frequency it pairs on.
///
/// `address` is in logical order (`address[0]` is byte 0). Reports and
/// commands put these bytes on the wire in opposite orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AddressEntry {
    pub address: [u8; 5],
    pub frequency_mhz: u16,
}

impl AddressEntry {
    pub fn new(address: [u8; 5], frequency_mhz: u16) -> Self {
        Self {
            address,
            frequency_mhz,
        }
    }

    /// Build from a caller-supplied slice, which must hold exactly 5 bytes.
    pub fn from_slice(address: &[u8], frequency_mhz: u16) -> Result<Self, EncodeError> {
        let address = address
            .try_into()
            .map_err(|_| EncodeError::AddressLength { len: address.len() })?;
        Ok(Self::new(address, frequency_mhz))
    }

    /// All five address bytes are zero.
    pub fn is_empty(&self) -> bool {
        self.address.iter().all(|b| *b == 0)
    }

    pub(crate) fn from_fields(fields: Required<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            address: [
                fields.u8("addr0")?,
                fields.u8("addr1")?,
                fields.u8("addr2")?,
                fields.u8("addr3")?,
                fields.u8("addr4")?,
            ],
            frequency_mhz: fields.scaled("frequency")? as u16,
        })
    }

    pub(crate) fn to_fields(&self) -> Result<Fields, EncodeError> {
        let offset = units::frequency_to_offset(self.frequency_mhz).ok_or(
            EncodeError::FrequencyOutOfRange {
                mhz: self.frequency_mhz,
            },
        )?;
        let [a0, a1, a2, a3, a4] = self.address;
        Ok(Fields::new()
            .with("addr0", Value::U8(a0))
            .with("addr1", Value::U8(a1))
            .with("addr2", Value::U8(a2))
            .with("addr3", Value::U8(a3))
            .with("addr4", Value::U8(a4))
            .with("frequency", Value::U8(offset)))
    }
}

/// Device identity byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DeviceInfo {
    pub kind: DeviceKind,
    pub has_display: bool,
    pub raw: u8,
}

/// The two product variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum DeviceKind {
    /// With local display.
    M01,
    M02,
}

/// Identity byte of the display variant.
pub const DEVICE_WITH_DISPLAY: u8 = 0x10;

impl DeviceInfo {
    pub fn from_raw(raw: u8) -> Self {
        let has_display = raw == DEVICE_WITH_DISPLAY;
        Self {
            kind: if has_display {
                DeviceKind::M01
            } else {
                DeviceKind::M02
            },
            has_display,
            raw,
        }
    }
}

/// Decoded device-to-host packet.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum Report {
    Synthesize(Synthesize),
    Wave(Wave),
    Addresses { entries: Vec<AddressEntry> },
    /// The device switched its active channel.
    ChannelSwitch { channel: u8 },
    DeviceInfo(DeviceInfo),
    /// The radio module reported error 240.
    Error240,
}

impl Report {
    pub fn kind(&self) -> PacketKind {
        match self {
            Report::Synthesize(_) => PacketKind::Synthesize,
            Report::Wave(_) => PacketKind::Wave,
            Report::Addresses { .. } => PacketKind::Addresses,
            Report::ChannelSwitch { .. } => PacketKind::ChannelSwitch,
            Report::DeviceInfo(_) => PacketKind::DeviceInfo,
            Report::Error240 => PacketKind::Error240,
        }
    }

    /// Build the record for a report kind from its decoded fields.
    ///
    /// Returns `None` when `kind` is a command.
    pub(crate) fn from_fields(
        kind: PacketKind,
        fields: &Fields,
    ) -> Option<Result<Self, DecodeError>> {
        let fields = Required::new(kind, fields);
        let report = match kind {
            PacketKind::Synthesize => fields
                .each("channels", ChannelStatus::from_fields)
                .map(|channels| Report::Synthesize(Synthesize { channels })),
            PacketKind::Wave => fields
                .each("groups", |group| {
                    Ok(WaveGroup {
                        timestamp: group.u32("timestamp")?,
                        samples: group.each("samples", |sample| {
                            Ok(WaveSample {
                                voltage: sample.scaled("voltage")?,
                                current: sample.scaled("current")?,
                            })
                        })?,
                    })
                })
                .map(|groups| Report::Wave(Wave { groups })),
            PacketKind::Addresses => fields
                .each("entries", AddressEntry::from_fields)
                .map(|entries| Report::Addresses { entries }),
            PacketKind::ChannelSwitch => fields
                .u8("channel")
                .map(|channel| Report::ChannelSwitch { channel }),
            PacketKind::DeviceInfo => fields
                .u8("machine")
                .map(|raw| Report::DeviceInfo(DeviceInfo::from_raw(raw))),
            PacketKind::Error240 => Ok(Report::Error240),
            _ => return None,
        };
        Some(report)
    }

    pub(crate) fn to_fields(&self) -> Result<Fields, EncodeError> {
        Ok(match self {
            Report::Synthesize(synthesize) => Fields::new().with(
                "channels",
                Value::Groups(
                    synthesize
                        .channels
                        .iter()
                        .map(ChannelStatus::to_fields)
                        .collect::<Result<_, _>>()?,
                ),
            ),
            Report::Wave(wave) => {
                let mut groups = Vec::with_capacity(wave.groups.len());
                for group in &wave.groups {
                    let mut samples = Vec::with_capacity(group.samples.len());
                    for sample in &group.samples {
                        samples.push(
                            Fields::new()
                                .with("voltage", milli("voltage", sample.voltage)?)
                                .with("current", milli("current", sample.current)?),
                        );
                    }
                    groups.push(
                        Fields::new()
                            .with("timestamp", Value::U32(group.timestamp))
                            .with("samples", Value::Groups(samples)),
                    );
                }
                Fields::new().with("groups", Value::Groups(groups))
            }
            Report::Addresses { entries } => Fields::new().with(
                "entries",
                Value::Groups(
                    entries
                        .iter()
                        .map(AddressEntry::to_fields)
                        .collect::<Result<_, _>>()?,
                ),
            ),
            Report::ChannelSwitch { channel } => {
                Fields::new().with("channel", Value::U8(*channel))
            }
            Report::DeviceInfo(info) => Fields::new().with("machine", Value::U8(info.raw)),
            Report::Error240 => Fields::new(),
        })
    }
}

/// V/A to a milli-unit field value.
pub(crate) fn milli(field: &'static str, value: f64) -> Result<Value, EncodeError> {
    units::base_to_milli(value)
        .map(Value::U16)
        .ok_or(EncodeError::ValueOutOfRange {
            field,
            value,
            max: units::MILLI_MAX,
        })
}

fn deci(field: &'static str, value: f64) -> Result<Value, EncodeError> {
    units::base_to_deci(value)
        .map(Value::U16)
        .ok_or(EncodeError::ValueOutOfRange {
            field,
            value,
            max: u16::MAX as f64 / 10.0,
        })
}

/// Field lookups that fail with [`DecodeError::MissingField`].
#[derive(Clone, Copy)]
pub(crate) struct Required<'a> {
    kind: PacketKind,
    inner: &'a Fields,
}

impl<'a> Required<'a> {
    pub(crate) fn new(kind: PacketKind, inner: &'a Fields) -> Self {
        Self { kind, inner }
    }

    fn missing(&self, field: &'static str) -> DecodeError {
        DecodeError::MissingField {
            kind: self.kind,
            field,
        }
    }

    pub(crate) fn u8(&self, field: &'static str) -> Result<u8, DecodeError> {
        self.inner.u8(field).ok_or_else(|| self.missing(field))
    }

    pub(crate) fn u32(&self, field: &'static str) -> Result<u32, DecodeError> {
        self.inner.u32(field).ok_or_else(|| self.missing(field))
    }

    pub(crate) fn bytes(&self, field: &'static str) -> Result<&'a [u8], DecodeError> {
        self.inner.bytes(field).ok_or_else(|| self.missing(field))
    }

    pub(crate) fn scaled(&self, field: &'static str) -> Result<f64, DecodeError> {
        self.inner.scaled(field).ok_or_else(|| self.missing(field))
    }

    pub(crate) fn flag(&self, field: &'static str) -> Result<bool, DecodeError> {
        self.inner.flag(field).ok_or_else(|| self.missing(field))
    }

    fn reading(&self, voltage: &'static str, current: &'static str) -> Result<Reading, DecodeError> {
        Ok(Reading {
            voltage: self.scaled(voltage)?,
            current: self.scaled(current)?,
        })
    }

    /// Build one value per group of a repeat.
    pub(crate) fn each<T>(
        &self,
        field: &'static str,
        build: impl Fn(Required<'a>) -> Result<T, DecodeError>,
    ) -> Result<Vec<T>, DecodeError> {
        self.inner
            .groups(field)
            .ok_or_else(|| self.missing(field))?
            .iter()
            .map(|group| build(Required::new(self.kind, group)))
            .collect()
    }
}
