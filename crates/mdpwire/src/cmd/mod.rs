use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode captured bytes into packets.
    Decode(DecodeArgs),
    /// Print the frame bytes of a command.
    Encode(EncodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Decode(args) => decode::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Hex-encoded bytes. Reads stdin when neither --hex nor --file is given.
    #[arg(long, conflicts_with = "file")]
    pub hex: Option<String>,
    /// Binary capture to read.
    #[arg(long, conflicts_with = "hex")]
    pub file: Option<PathBuf>,
    /// Feed the assembler at most this many bytes at a time.
    #[arg(long, default_value = "256", value_parser = clap::value_parser!(u16).range(1..))]
    pub chunk: u16,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[command(subcommand)]
    pub intent: Intent,
}

#[derive(Subcommand, Debug)]
pub enum Intent {
    /// Select the active channel.
    SetCh(ChannelArg),
    /// Set voltage and current limit.
    SetV(SetPointArgs),
    /// Set current and voltage limit.
    SetI(SetPointArgs),
    /// Switch a channel's output.
    SetOutput(SwitchArgs),
    /// Set one channel's radio address.
    SetAddr(AddressArgs),
    /// Replace the whole address table.
    SetAllAddr(AllAddressArgs),
    /// Ask for the address table.
    GetAddr,
    /// Ask for the device identity.
    GetMachine,
    Heartbeat,
    StartAutoMatch,
    StopAutoMatch,
    ResetToDfu,
    /// Switch the RGB indicator.
    Rgb(ToggleArg),
}

#[derive(Args, Debug)]
pub struct ChannelArg {
    #[arg(long, short = 'c')]
    pub channel: u8,
}

#[derive(Args, Debug)]
pub struct SetPointArgs {
    #[arg(long, short = 'c')]
    pub channel: u8,
    /// Volts.
    #[arg(long)]
    pub voltage: f64,
    /// Amperes.
    #[arg(long)]
    pub current: f64,
}

#[derive(Args, Debug)]
pub struct SwitchArgs {
    #[arg(long, short = 'c')]
    pub channel: u8,
    pub state: Toggle,
}

#[derive(Args, Debug)]
pub struct ToggleArg {
    pub state: Toggle,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn enabled(self) -> bool {
        self == Toggle::On
    }
}

#[derive(Args, Debug)]
pub struct AddressArgs {
    #[arg(long, short = 'c')]
    pub channel: u8,
    /// Five address bytes in hex, e.g. 0504030201.
    #[arg(long)]
    pub address: String,
    /// Pairing frequency in MHz (2400-2655).
    #[arg(long)]
    pub frequency: u16,
}

#[derive(Args, Debug)]
pub struct AllAddressArgs {
    /// One entry per channel as ADDRESS@MHZ, e.g. 0504030201@2440.
    #[arg(long = "entry", value_name = "ADDRESS@MHZ", required = true)]
    pub entries: Vec<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
