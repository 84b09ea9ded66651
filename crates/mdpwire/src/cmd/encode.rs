use mdpwire_packet::{AddressEntry, Command, PacketEncoder};

use crate::cmd::{EncodeArgs, Intent};
use crate::exit::{encode_error, CliError, CliResult, SUCCESS};
use crate::hexdump::parse_hex;
use crate::output::{print_encoded, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let command = to_command(args.intent)?;
    let bytes = PacketEncoder::new()
        .encode(&command)
        .map_err(|err| encode_error("encode failed", err))?;
    print_encoded(&command, &bytes, format);
    Ok(SUCCESS)
}

fn to_command(intent: Intent) -> CliResult<Command> {
    Ok(match intent {
        Intent::SetCh(args) => Command::SelectChannel {
            channel: args.channel,
        },
        Intent::SetV(args) => Command::set_voltage(args.channel, args.voltage, args.current),
        Intent::SetI(args) => Command::set_current(args.channel, args.voltage, args.current),
        Intent::SetOutput(args) => Command::SetOutput {
            channel: args.channel,
            enabled: args.state.enabled(),
        },
        Intent::SetAddr(args) => Command::SetAddress {
            channel: args.channel,
            entry: parse_entry(&args.address, args.frequency)?,
        },
        Intent::SetAllAddr(args) => Command::SetAllAddresses {
            entries: args
                .entries
                .iter()
                .map(|text| {
                    let (address, mhz) = text.split_once('@').ok_or_else(|| {
                        CliError::usage(format!("entry `{text}` is not ADDRESS@MHZ"))
                    })?;
                    let mhz = mhz.trim().parse::<u16>().map_err(|err| {
                        CliError::usage(format!("entry `{text}`: bad frequency: {err}"))
                    })?;
                    parse_entry(address, mhz)
                })
                .collect::<CliResult<_>>()?,
        },
        Intent::GetAddr => Command::GetAddresses,
        Intent::GetMachine => Command::GetMachine,
        Intent::Heartbeat => Command::Heartbeat,
        Intent::StartAutoMatch => Command::StartAutoMatch,
        Intent::StopAutoMatch => Command::StopAutoMatch,
        Intent::ResetToDfu => Command::ResetToDfu,
        Intent::Rgb(args) => Command::Rgb {
            enabled: args.state.enabled(),
        },
    })
}

fn parse_entry(address: &str, frequency_mhz: u16) -> CliResult<AddressEntry> {
    let bytes =
        parse_hex(address).map_err(|err| CliError::usage(format!("address `{address}`: {err}")))?;
    AddressEntry::from_slice(&bytes, frequency_mhz)
        .map_err(|err| encode_error(&format!("address `{address}`"), err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::{AllAddressArgs, SetPointArgs, Toggle, ToggleArg};
    use crate::exit::USAGE;

    #[test]
    fn maps_set_point_intent() {
        let command = to_command(Intent::SetI(SetPointArgs {
            channel: 3,
            voltage: 5.0,
            current: 1.5,
        }))
        .unwrap();
        assert_eq!(command, Command::set_current(3, 5.0, 1.5));
    }

    #[test]
    fn maps_toggle() {
        let command = to_command(Intent::Rgb(ToggleArg { state: Toggle::Off })).unwrap();
        assert_eq!(command, Command::Rgb { enabled: false });
    }

    #[test]
    fn parses_address_entries() {
        let command = to_command(Intent::SetAllAddr(AllAddressArgs {
            entries: vec!["0504030201@2440".into(), "0000000000@2400".into()],
        }))
        .unwrap();
        let Command::SetAllAddresses { entries } = command else {
            panic!("expected set_all_addr");
        };
        assert_eq!(entries[0], AddressEntry::new([5, 4, 3, 2, 1], 2440));
        assert!(entries[1].is_empty());
    }

    #[test]
    fn bad_entries_are_usage_errors() {
        for entry in ["0504030201", "05040302@2440", "0504030201@x"] {
            let err = to_command(Intent::SetAllAddr(AllAddressArgs {
                entries: vec![entry.into()],
            }))
            .unwrap_err();
            assert_eq!(err.code, USAGE, "{entry}");
        }
    }
}
