use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use mdpwire_packet::{
    AddressEntry, Command, DecodeError, Message, OperatingMode, Packet, Report, BROADCAST_CHANNEL,
};
use serde::Serialize;

use crate::hexdump::to_hex;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One frame's decode outcome.
#[derive(Serialize)]
pub struct DecodedRow {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packet: Option<Packet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DecodedRow {
    pub fn packet(index: usize, packet: Packet) -> Self {
        Self {
            index,
            packet: Some(packet),
            error: None,
        }
    }

    pub fn error(index: usize, err: &DecodeError) -> Self {
        Self {
            index,
            packet: None,
            error: Some(err.to_string()),
        }
    }

    fn type_name(&self) -> String {
        match &self.packet {
            Some(packet) => match packet.kind() {
                Some(kind) => kind.name().to_string(),
                None => format!("0x{:02X}", packet.code()),
            },
            None => "-".to_string(),
        }
    }

    fn channel(&self) -> String {
        self.packet
            .as_ref()
            .map_or_else(|| "-".to_string(), |packet| channel_label(packet.channel))
    }

    fn detail(&self) -> String {
        match (&self.packet, &self.error) {
            (Some(packet), _) => describe(&packet.message),
            (None, Some(error)) => format!("dropped: {error}"),
            (None, None) => String::new(),
        }
    }
}

pub fn print_decoded(rows: &[DecodedRow], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for row in rows {
                println!(
                    "{}",
                    serde_json::to_string(row).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["#", "TYPE", "CHANNEL", "DETAIL"]);
            for row in rows {
                table.add_row(vec![
                    row.index.to_string(),
                    row.type_name(),
                    row.channel(),
                    row.detail(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for row in rows {
                println!(
                    "#{} type={} channel={} {}",
                    row.index,
                    row.type_name(),
                    row.channel(),
                    row.detail()
                );
            }
        }
    }
}

#[derive(Serialize)]
struct EncodedOutput<'a> {
    command: &'a Command,
    size: usize,
    bytes: String,
}

pub fn print_encoded(command: &Command, bytes: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = EncodedOutput {
                command,
                size: bytes.len(),
                bytes: to_hex(bytes),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TYPE", "CHANNEL", "SIZE", "BYTES"])
                .add_row(vec![
                    command.kind().name().to_string(),
                    channel_label(command.header_channel()),
                    bytes.len().to_string(),
                    to_hex(bytes),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{}", to_hex(bytes)),
    }
}

fn channel_label(channel: u8) -> String {
    if channel == BROADCAST_CHANNEL {
        "all".to_string()
    } else {
        channel.to_string()
    }
}

fn address_label(entry: &AddressEntry) -> String {
    format!("{}@{}", hex::encode_upper(entry.address), entry.frequency_mhz)
}

fn mode_label(mode: OperatingMode) -> &'static str {
    match mode {
        OperatingMode::Off => "off",
        OperatingMode::On => "on",
        OperatingMode::ConstantCurrent => "CC",
        OperatingMode::ConstantVoltage => "CV",
        OperatingMode::ConstantResistance => "CR",
        OperatingMode::ConstantPower => "CP",
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

/// One-line summary of a packet.
pub fn describe(message: &Message) -> String {
    match message {
        Message::Report(report) => describe_report(report),
        Message::Command(command) => describe_command(command),
        Message::Unknown { code, payload } => {
            format!("unknown type 0x{code:02X}, {} payload bytes", payload.len())
        }
    }
}

fn describe_report(report: &Report) -> String {
    match report {
        Report::Synthesize(snapshot) => snapshot
            .online_channels()
            .map(|ch| {
                format!(
                    "ch{} {} {:.3}V {:.3}A {}",
                    ch.num,
                    mode_label(ch.mode),
                    ch.output.voltage,
                    ch.output.current,
                    if ch.error { "ERR" } else { "ok" }
                )
            })
            .collect::<Vec<_>>()
            .join("; "),
        Report::Wave(wave) => format!(
            "{} groups x {} samples",
            wave.groups.len(),
            wave.samples_per_group()
        ),
        Report::Addresses { entries } => entries
            .iter()
            .map(address_label)
            .collect::<Vec<_>>()
            .join(" "),
        Report::ChannelSwitch { channel } => format!("switched to channel {channel}"),
        Report::DeviceInfo(info) => format!("{:?} (raw 0x{:02X})", info.kind, info.raw),
        Report::Error240 => "radio error 240".to_string(),
    }
}

fn describe_command(command: &Command) -> String {
    match command {
        Command::SetVoltage {
            voltage, current, ..
        }
        | Command::SetCurrent {
            voltage, current, ..
        } => format!("{voltage:.3}V {current:.3}A"),
        Command::SetOutput { enabled, .. } | Command::Rgb { enabled } => {
            on_off(*enabled).to_string()
        }
        Command::SetAddress { entry, .. } => address_label(entry),
        Command::SetAllAddresses { entries } => format!("{} entries", entries.len()),
        Command::SelectChannel { .. }
        | Command::GetAddresses
        | Command::GetMachine
        | Command::Heartbeat
        | Command::StartAutoMatch
        | Command::StopAutoMatch
        | Command::ResetToDfu => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use mdpwire_packet::DeviceInfo;

    use super::*;

    #[test]
    fn describes_commands() {
        assert_eq!(
            describe(&Message::Command(Command::set_voltage(0, 3.3, 0.5))),
            "3.300V 0.500A"
        );
        assert_eq!(
            describe(&Message::Command(Command::Rgb { enabled: true })),
            "on"
        );
        assert_eq!(
            describe(&Message::Command(Command::SetAddress {
                channel: 1,
                entry: AddressEntry::new([5, 4, 3, 2, 1], 2440),
            })),
            "0504030201@2440"
        );
    }

    #[test]
    fn describes_reports() {
        assert_eq!(
            describe(&Message::Report(Report::DeviceInfo(DeviceInfo::from_raw(0x10)))),
            "M01 (raw 0x10)"
        );
        assert_eq!(
            describe(&Message::Report(Report::ChannelSwitch { channel: 2 })),
            "switched to channel 2"
        );
    }

    #[test]
    fn broadcast_channel_label() {
        assert_eq!(channel_label(BROADCAST_CHANNEL), "all");
        assert_eq!(channel_label(4), "4");
    }

    #[test]
    fn decoded_row_json_omits_missing_parts() {
        let row = DecodedRow::error(3, &DecodeError::Frame(mdpwire_packet::FrameError::InvalidMagic));
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["index"], 3);
        assert!(json.get("packet").is_none());
        assert!(json["error"].as_str().unwrap().contains("magic"));
    }
}
