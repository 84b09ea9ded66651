//! Generic reader/writer over a [`schema`](crate::schema) layout.

use bytes::{Buf, BufMut, BytesMut};
use mdpwire_frame::HEADER_SIZE;

use crate::error::{DecodeError, EncodeError};
use crate::schema::{Count, Element, Field, PacketKind, Presence, Scale, Width};

/// One decoded value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    U8(u8),
    U16(u16),
    U32(u32),
    Bytes(Vec<u8>),
    Groups(Vec<Fields>),
}

impl Value {
    /// The value as an unsigned integer, if it is one.
    pub fn as_uint(&self) -> Option<u32> {
        match self {
            Value::U8(v) => Some(u32::from(*v)),
            Value::U16(v) => Some(u32::from(*v)),
            Value::U32(v) => Some(*v),
            Value::Bytes(_) | Value::Groups(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    name: &'static str,
    scale: Scale,
    value: Value,
}

/// Named values of one record, in wire order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    entries: Vec<Entry>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value. Later inserts under the same name shadow earlier ones.
    pub fn insert(&mut self, name: &'static str, value: Value) {
        self.push(name, Scale::Raw, value);
    }

    /// Builder form of [`Self::insert`].
    pub fn with(mut self, name: &'static str, value: Value) -> Self {
        self.insert(name, value);
        self
    }

    fn push(&mut self, name: &'static str, scale: Scale, value: Value) {
        self.entries.push(Entry { name, scale, value });
    }

    fn entry(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().rev().find(|entry| entry.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entry(name).map(|entry| &entry.value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    pub fn uint(&self, name: &str) -> Option<u32> {
        self.get(name).and_then(Value::as_uint)
    }

    pub fn u8(&self, name: &str) -> Option<u8> {
        match self.get(name)? {
            Value::U8(v) => Some(*v),
            _ => None,
        }
    }

    pub fn u16(&self, name: &str) -> Option<u16> {
        match self.get(name)? {
            Value::U16(v) => Some(*v),
            _ => None,
        }
    }

    pub fn u32(&self, name: &str) -> Option<u32> {
        match self.get(name)? {
            Value::U32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn bytes(&self, name: &str) -> Option<&[u8]> {
        match self.get(name)? {
            Value::Bytes(v) => Some(v),
            _ => None,
        }
    }

    pub fn groups(&self, name: &str) -> Option<&[Fields]> {
        match self.get(name)? {
            Value::Groups(v) => Some(v),
            _ => None,
        }
    }

    /// The value converted by the scale its layout field declares.
    pub fn scaled(&self, name: &str) -> Option<f64> {
        let entry = self.entry(name)?;
        entry.value.as_uint().map(|raw| entry.scale.to_base(raw))
    }

    /// The value read as a flag, using the comparison its layout field declares.
    pub fn flag(&self, name: &str) -> Option<bool> {
        let entry = self.entry(name)?;
        entry.value.as_uint().map(|raw| entry.scale.to_flag(raw))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names in wire order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|entry| entry.name)
    }
}

fn is_present(presence: Presence, fields: &Fields) -> bool {
    match presence {
        Presence::Always => true,
        Presence::When(name, value) => fields.uint(name) == Some(value),
        Presence::Unless(name, value) => fields.uint(name) != Some(value),
    }
}

/// Read `payload` against the layout of `kind`, consuming it exactly.
///
/// Frame sizes that a size-dependent repeat does not list are rejected
/// before any field is read.
pub fn read(kind: PacketKind, payload: &[u8], frame_size: usize) -> Result<Fields, DecodeError> {
    if !size_supported(kind.layout(), frame_size) {
        return Err(DecodeError::UnsupportedSize {
            kind,
            size: frame_size,
        });
    }
    let mut src = payload;
    let fields = read_elements(kind, kind.layout(), &mut src, frame_size)?;
    if !src.is_empty() {
        return Err(DecodeError::TrailingBytes {
            kind,
            extra: src.len(),
        });
    }
    Ok(fields)
}

fn size_supported(elements: &[Element], frame_size: usize) -> bool {
    elements.iter().all(|element| match element {
        Element::Field(_) => true,
        Element::Repeat { count, body, .. } => {
            count.resolve(frame_size).is_some() && size_supported(body, frame_size)
        }
    })
}

fn read_elements(
    kind: PacketKind,
    elements: &'static [Element],
    src: &mut &[u8],
    frame_size: usize,
) -> Result<Fields, DecodeError> {
    let mut fields = Fields::new();
    for element in elements {
        match *element {
            Element::Field(field) => {
                if !is_present(field.presence, &fields) {
                    continue;
                }
                let value = read_field(kind, &field, src)?;
                fields.push(field.name, field.scale, value);
            }
            Element::Repeat { name, count, body } => {
                let n = count
                    .resolve(frame_size)
                    .ok_or(DecodeError::UnsupportedSize {
                        kind,
                        size: frame_size,
                    })?;
                let groups = (0..n)
                    .map(|_| read_elements(kind, body, src, frame_size))
                    .collect::<Result<Vec<_>, _>>()?;
                fields.push(name, Scale::Raw, Value::Groups(groups));
            }
        }
    }
    Ok(fields)
}

fn read_field(kind: PacketKind, field: &Field, src: &mut &[u8]) -> Result<Value, DecodeError> {
    if src.remaining() < field.width.size() {
        return Err(DecodeError::Truncated {
            kind,
            field: field.name,
        });
    }
    Ok(match field.width {
        Width::U8 => Value::U8(src.get_u8()),
        Width::U16 => Value::U16(src.get_u16_le()),
        Width::U32 => Value::U32(src.get_u32_le()),
        Width::Bytes(n) => {
            let (head, tail) = src.split_at(n);
            *src = tail;
            Value::Bytes(head.to_vec())
        }
    })
}

/// Append the payload for `fields` laid out as `kind`.
///
/// Size-dependent repeat counts must agree with the frame size the payload
/// ends up producing.
pub fn write(kind: PacketKind, fields: &Fields, dst: &mut BytesMut) -> Result<(), EncodeError> {
    let start = dst.len();
    let result = write_elements(kind, kind.layout(), fields, dst).and_then(|()| {
        let frame_size = HEADER_SIZE + (dst.len() - start);
        check_counts(kind, kind.layout(), fields, frame_size)
    });
    if result.is_err() {
        dst.truncate(start);
    }
    result
}

fn write_elements(
    kind: PacketKind,
    elements: &'static [Element],
    fields: &Fields,
    dst: &mut BytesMut,
) -> Result<(), EncodeError> {
    for element in elements {
        let mismatch = || EncodeError::FieldMismatch {
            kind,
            field: element.name(),
        };
        match *element {
            Element::Field(field) => {
                if !is_present(field.presence, fields) {
                    continue;
                }
                let value = fields.get(field.name).ok_or_else(mismatch)?;
                match (field.width, value) {
                    (Width::U8, Value::U8(v)) => dst.put_u8(*v),
                    (Width::U16, Value::U16(v)) => dst.put_u16_le(*v),
                    (Width::U32, Value::U32(v)) => dst.put_u32_le(*v),
                    (Width::Bytes(n), Value::Bytes(v)) if v.len() == n => dst.put_slice(v),
                    _ => return Err(mismatch()),
                }
            }
            Element::Repeat { name, count, body } => {
                let groups = fields.groups(name).ok_or_else(mismatch)?;
                if !count.allows(groups.len()) {
                    return Err(mismatch());
                }
                for group in groups {
                    write_elements(kind, body, group, dst)?;
                }
            }
        }
    }
    Ok(())
}

/// Check every `ByFrameSize` repeat against the frame size actually written.
fn check_counts(
    kind: PacketKind,
    elements: &'static [Element],
    fields: &Fields,
    frame_size: usize,
) -> Result<(), EncodeError> {
    for element in elements {
        if let Element::Repeat { name, count, body } = *element {
            let groups = fields.groups(name).unwrap_or_default();
            if let Count::ByFrameSize(_) = count {
                if count.resolve(frame_size) != Some(groups.len()) {
                    return Err(EncodeError::FieldMismatch { kind, field: name });
                }
            }
            for group in groups {
                check_counts(kind, body, group, frame_size)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_set_point() {
        let fields = read(PacketKind::SetVoltage, &[0xE4, 0x0C, 0xF4, 0x01], 10).unwrap();

        assert_eq!(fields.u16("voltage"), Some(3300));
        assert_eq!(fields.scaled("voltage"), Some(3.3));
        assert_eq!(fields.scaled("current"), Some(0.5));
        assert_eq!(fields.names().collect::<Vec<_>>(), vec!["voltage", "current"]);
    }

    #[test]
    fn test_read_rejects_short_and_long_payloads() {
        let err = read(PacketKind::SetVoltage, &[0xE4, 0x0C, 0xF4], 9).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Truncated {
                field: "current",
                ..
            }
        ));

        let err = read(PacketKind::Rgb, &[1, 0], 8).unwrap_err();
        assert!(matches!(err, DecodeError::TrailingBytes { extra: 1, .. }));

        let err = read(PacketKind::Heartbeat, &[0], 7).unwrap_err();
        assert!(matches!(err, DecodeError::TrailingBytes { extra: 1, .. }));
    }

    #[test]
    fn test_presence_follows_machine_type() {
        let mut record = vec![0u8; 25];
        record[16] = 3; // machine_type = L1060
        record[18] = 2; // status byte
        let mut payload = record.clone();
        for _ in 1..6 {
            payload.extend_from_slice(&[0u8; 25]);
        }

        let fields = read(PacketKind::Synthesize, &payload, 156).unwrap();
        let channels = fields.groups("channels").unwrap();
        assert_eq!(channels.len(), 6);
        assert_eq!(channels[0].u8("status_load"), Some(2));
        assert!(!channels[0].contains("status_psu"));
        assert_eq!(channels[1].u8("status_psu"), Some(0));
        assert!(!channels[1].contains("status_load"));
    }

    #[test]
    fn test_flags_use_declared_comparison() {
        let mut payload = vec![0u8; 150];
        payload[15] = 2; // online
        payload[17] = 2; // lock
        payload[23] = 2; // error

        let fields = read(PacketKind::Synthesize, &payload, 156).unwrap();
        let first = &fields.groups("channels").unwrap()[0];
        assert_eq!(first.flag("online"), Some(true));
        assert_eq!(first.flag("lock"), Some(false));
        assert_eq!(first.flag("error"), Some(false));
    }

    #[test]
    fn test_repeat_count_from_frame_size() {
        let fields = read(PacketKind::Wave, &[0u8; 120], 126).unwrap();
        let groups = fields.groups("groups").unwrap();
        assert_eq!(groups.len(), 10);
        assert!(groups.iter().all(|g| g.groups("samples").unwrap().len() == 2));

        let fields = read(PacketKind::Wave, &[0u8; 200], 206).unwrap();
        let groups = fields.groups("groups").unwrap();
        assert!(groups.iter().all(|g| g.groups("samples").unwrap().len() == 4));

        let err = read(PacketKind::Wave, &[0u8; 160], 166).unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedSize { size: 166, .. }));
    }

    #[test]
    fn test_write_follows_layout_order() {
        let fields = Fields::new()
            .with("addr0", Value::U8(5))
            .with("addr1", Value::U8(4))
            .with("addr2", Value::U8(3))
            .with("addr3", Value::U8(2))
            .with("addr4", Value::U8(1))
            .with("frequency", Value::U8(40));
        let mut dst = BytesMut::new();

        write(PacketKind::SetAddress, &fields, &mut dst).unwrap();

        assert_eq!(dst.as_ref(), &[5, 4, 3, 2, 1, 40]);
    }

    #[test]
    fn test_write_rejects_wrong_shape() {
        let mut dst = BytesMut::new();
        let fields = Fields::new()
            .with("voltage", Value::U8(1))
            .with("current", Value::U16(1));
        let err = write(PacketKind::SetVoltage, &fields, &mut dst).unwrap_err();
        assert!(matches!(
            err,
            EncodeError::FieldMismatch {
                field: "voltage",
                ..
            }
        ));

        let fields = Fields::new().with("entries", Value::Groups(vec![Fields::new(); 5]));
        let err = write(PacketKind::SetAllAddresses, &fields, &mut dst).unwrap_err();
        assert!(matches!(
            err,
            EncodeError::FieldMismatch {
                field: "entries",
                ..
            }
        ));
    }

    #[test]
    fn test_write_checks_size_dependent_counts() {
        let group = |n| {
            Fields::new()
                .with("timestamp", Value::U32(7))
                .with("samples", Value::Groups(vec![sample(); n]))
        };
        let wave = |groups: Vec<Fields>| Fields::new().with("groups", Value::Groups(groups));

        let mut dst = BytesMut::new();
        write(PacketKind::Wave, &wave(vec![group(4); 10]), &mut dst).unwrap();
        assert_eq!(dst.len() + HEADER_SIZE, 206);

        let mut mixed = vec![group(2); 10];
        mixed[9] = group(4);
        let mut dst = BytesMut::new();
        let err = write(PacketKind::Wave, &wave(mixed), &mut dst).unwrap_err();
        assert!(matches!(
            err,
            EncodeError::FieldMismatch {
                field: "samples",
                ..
            }
        ));
        assert!(dst.is_empty());
    }

    fn sample() -> Fields {
        Fields::new()
            .with("voltage", Value::U16(5000))
            .with("current", Value::U16(100))
    }
}
