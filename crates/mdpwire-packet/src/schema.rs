//! The packet table.
//!
//! Each type code maps to a flat list of layout elements. Both the decoder
//! and the encoder walk the same list (see [`crate::layout`]), so changing a
//! packet's layout touches one entry here.
//!
//! Two kinds of conditional layout are expressed declaratively:
//! - [`Presence`]: a field is read only when an earlier field of the same
//!   record holds (or does not hold) a given value;
//! - [`Count::ByFrameSize`]: a repeat count chosen from the total frame size.

use std::fmt;

use mdpwire_frame::units;

/// Machine-type code of the electronic load, which swaps the status field.
pub const MACHINE_L1060: u8 = 3;

/// Channels per device.
pub const CHANNEL_COUNT: usize = 6;

/// Sample groups per wave frame.
pub const WAVE_GROUPS: usize = 10;

/// Who sends a packet type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Device to host.
    Report,
    /// Host to device.
    Command,
}

macro_rules! packet_kinds {
    ($($variant:ident = $code:literal, $name:literal, $dir:ident, $layout:expr;)+) => {
        /// Every packet type code the device family uses.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize))]
        #[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
        #[repr(u8)]
        pub enum PacketKind {
            $($variant = $code,)+
        }

        impl PacketKind {
            /// All kinds, in code order.
            pub const ALL: &'static [PacketKind] = &[$(PacketKind::$variant,)+];

            /// Look up a type code.
            pub fn from_code(code: u8) -> Option<Self> {
                match code {
                    $($code => Some(PacketKind::$variant),)+
                    _ => None,
                }
            }

            /// Wire name of the type.
            pub fn name(self) -> &'static str {
                match self {
                    $(PacketKind::$variant => $name,)+
                }
            }

            pub fn direction(self) -> Direction {
                match self {
                    $(PacketKind::$variant => Direction::$dir,)+
                }
            }

            /// Payload layout of this type.
            pub fn layout(self) -> &'static [Element] {
                match self {
                    $(PacketKind::$variant => $layout,)+
                }
            }
        }
    };
}

packet_kinds! {
    Synthesize      = 0x11, "synthesize",       Report,  SYNTHESIZE;
    Wave            = 0x12, "wave",             Report,  WAVE;
    Addresses       = 0x13, "addr",             Report,  ADDR_REPORT;
    ChannelSwitch   = 0x14, "updat_ch",         Report,  UPDAT_CH;
    DeviceInfo      = 0x15, "machine",          Report,  MACHINE;
    SetOutput       = 0x16, "set_isoutput",     Command, SET_ISOUTPUT;
    GetAddresses    = 0x17, "get_addr",         Command, EMPTY;
    SetAddress      = 0x18, "set_addr",         Command, ADDR_COMMAND;
    SelectChannel   = 0x19, "set_ch",           Command, EMPTY;
    SetVoltage      = 0x1A, "set_v",            Command, SET_POINT;
    SetCurrent      = 0x1B, "set_i",            Command, SET_POINT;
    SetAllAddresses = 0x1C, "set_all_addr",     Command, ADDR_COMMAND_ALL;
    StartAutoMatch  = 0x1D, "start_auto_match", Command, EMPTY;
    StopAutoMatch   = 0x1E, "stop_auto_match",  Command, EMPTY;
    ResetToDfu      = 0x1F, "reset_to_dfu",     Command, EMPTY;
    Rgb             = 0x20, "rgb",              Command, RGB;
    GetMachine      = 0x21, "get_machine",      Command, EMPTY;
    Heartbeat       = 0x22, "heartbeat",        Command, EMPTY;
    Error240        = 0x23, "err_240",          Report,  EMPTY;
}

impl PacketKind {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Whether the header channel byte addresses one channel.
    pub fn is_per_channel(self) -> bool {
        matches!(
            self,
            PacketKind::SetOutput
                | PacketKind::SetAddress
                | PacketKind::SelectChannel
                | PacketKind::SetVoltage
                | PacketKind::SetCurrent
        )
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Wire width of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    U8,
    U16,
    U32,
    Bytes(usize),
}

impl Width {
    /// Bytes on the wire.
    pub fn size(self) -> usize {
        match self {
            Width::U8 => 1,
            Width::U16 => 2,
            Width::U32 => 4,
            Width::Bytes(n) => n,
        }
    }
}

/// How a raw integer becomes a caller-facing value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    Raw,
    /// mV/mA to V/A.
    Milli,
    /// Deci-degrees to degrees.
    Deci,
    /// Offset to MHz.
    Frequency,
    /// Flag set when the byte is not zero.
    NonZero,
    /// Flag set only when the byte is exactly 1.
    EqualsOne,
}

impl Scale {
    /// Apply the conversion to a raw integer.
    ///
    /// Milli and deci values are `u16` on the wire and frequency offsets are
    /// `u8`; a raw value wider than that yields NaN.
    pub fn to_base(self, raw: u32) -> f64 {
        match self {
            Scale::Milli => u16::try_from(raw).map_or(f64::NAN, units::milli_to_base),
            Scale::Deci => u16::try_from(raw).map_or(f64::NAN, units::deci_to_base),
            Scale::Frequency => u8::try_from(raw).map_or(f64::NAN, |offset| {
                f64::from(units::offset_to_frequency(offset))
            }),
            Scale::NonZero | Scale::EqualsOne => f64::from(u8::from(self.to_flag(raw))),
            Scale::Raw => raw as f64,
        }
    }

    /// Read a raw integer as a flag. Scales that are not flags use `!= 0`.
    pub fn to_flag(self, raw: u32) -> bool {
        match self {
            Scale::EqualsOne => raw == 1,
            _ => raw != 0,
        }
    }
}

/// When a field is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Always,
    /// Present when the named earlier field equals the value.
    When(&'static str, u32),
    /// Present when the named earlier field differs from the value.
    Unless(&'static str, u32),
}

/// One scalar or byte-array field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub width: Width,
    pub scale: Scale,
    pub presence: Presence,
}

/// How many times a repeated substructure occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Count {
    Fixed(usize),
    /// `(frame size, count)` pairs; other frame sizes are invalid.
    ByFrameSize(&'static [(usize, usize)]),
}

impl Count {
    /// Resolve the count for a frame of `frame_size` bytes.
    pub fn resolve(self, frame_size: usize) -> Option<usize> {
        match self {
            Count::Fixed(n) => Some(n),
            Count::ByFrameSize(table) => table
                .iter()
                .find(|(size, _)| *size == frame_size)
                .map(|(_, n)| *n),
        }
    }

    /// Whether `n` repetitions is a count this rule can produce.
    pub fn allows(self, n: usize) -> bool {
        match self {
            Count::Fixed(fixed) => fixed == n,
            Count::ByFrameSize(table) => table.iter().any(|(_, count)| *count == n),
        }
    }
}

/// One step of a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Element {
    Field(Field),
    Repeat {
        name: &'static str,
        count: Count,
        body: &'static [Element],
    },
}

impl Element {
    pub fn name(&self) -> &'static str {
        match self {
            Element::Field(field) => field.name,
            Element::Repeat { name, .. } => name,
        }
    }
}

const fn field(name: &'static str, width: Width, scale: Scale) -> Element {
    Element::Field(Field {
        name,
        width,
        scale,
        presence: Presence::Always,
    })
}

const fn byte(name: &'static str) -> Element {
    field(name, Width::U8, Scale::Raw)
}

const fn milli(name: &'static str) -> Element {
    field(name, Width::U16, Scale::Milli)
}

const EMPTY: &[Element] = &[];

const CHANNEL_RECORD: &[Element] = &[
    byte("num"),
    milli("out_voltage"),
    milli("out_current"),
    milli("in_voltage"),
    milli("in_current"),
    milli("set_voltage"),
    milli("set_current"),
    field("temperature", Width::U16, Scale::Deci),
    field("online", Width::U8, Scale::NonZero),
    byte("machine_type"),
    field("lock", Width::U8, Scale::EqualsOne),
    Element::Field(Field {
        name: "status_load",
        width: Width::U8,
        scale: Scale::Raw,
        presence: Presence::When("machine_type", MACHINE_L1060 as u32),
    }),
    Element::Field(Field {
        name: "status_psu",
        width: Width::U8,
        scale: Scale::Raw,
        presence: Presence::Unless("machine_type", MACHINE_L1060 as u32),
    }),
    field("output_on", Width::U8, Scale::NonZero),
    field("color", Width::Bytes(3), Scale::Raw),
    field("error", Width::U8, Scale::EqualsOne),
    byte("end"),
];

const SYNTHESIZE: &[Element] = &[Element::Repeat {
    name: "channels",
    count: Count::Fixed(CHANNEL_COUNT),
    body: CHANNEL_RECORD,
}];

const WAVE_SAMPLE: &[Element] = &[milli("voltage"), milli("current")];

const WAVE_GROUP: &[Element] = &[
    field("timestamp", Width::U32, Scale::Raw),
    Element::Repeat {
        name: "samples",
        count: Count::ByFrameSize(&[(126, 2), (206, 4)]),
        body: WAVE_SAMPLE,
    },
];

const WAVE: &[Element] = &[Element::Repeat {
    name: "groups",
    count: Count::Fixed(WAVE_GROUPS),
    body: WAVE_GROUP,
}];

/// Reports carry the address most significant byte first.
const ADDR_ENTRY_REPORT: &[Element] = &[
    byte("addr4"),
    byte("addr3"),
    byte("addr2"),
    byte("addr1"),
    byte("addr0"),
    field("frequency", Width::U8, Scale::Frequency),
];

/// Commands carry the address in natural order.
const ADDR_ENTRY_COMMAND: &[Element] = &[
    byte("addr0"),
    byte("addr1"),
    byte("addr2"),
    byte("addr3"),
    byte("addr4"),
    field("frequency", Width::U8, Scale::Frequency),
];

const ADDR_REPORT: &[Element] = &[Element::Repeat {
    name: "entries",
    count: Count::Fixed(CHANNEL_COUNT),
    body: ADDR_ENTRY_REPORT,
}];

const ADDR_COMMAND: &[Element] = ADDR_ENTRY_COMMAND;

const ADDR_COMMAND_ALL: &[Element] = &[Element::Repeat {
    name: "entries",
    count: Count::Fixed(CHANNEL_COUNT),
    body: ADDR_ENTRY_COMMAND,
}];

const UPDAT_CH: &[Element] = &[byte("channel")];

const MACHINE: &[Element] = &[byte("machine")];

const SET_ISOUTPUT: &[Element] = &[field("output", Width::U8, Scale::NonZero)];

const SET_POINT: &[Element] = &[milli("voltage"), milli("current")];

const RGB: &[Element] = &[field("enabled", Width::U8, Scale::NonZero)];
