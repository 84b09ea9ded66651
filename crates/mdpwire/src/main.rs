mod cmd;
mod exit;
mod hexdump;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "mdpwire", version, about = "Miniware MDP wire-protocol inspector")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::Intent;

    #[test]
    fn parses_decode_with_hex() {
        let cli = Cli::try_parse_from(["mdpwire", "decode", "--hex", "5A5A2206EE00"])
            .expect("decode args should parse");
        assert!(matches!(cli.command, Command::Decode(_)));
    }

    #[test]
    fn rejects_conflicting_inputs() {
        let err = Cli::try_parse_from(["mdpwire", "decode", "--hex", "00", "--file", "x.bin"])
            .expect_err("conflicting args should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn parses_encode_set_voltage() {
        let cli = Cli::try_parse_from([
            "mdpwire",
            "encode",
            "set-v",
            "--channel",
            "0",
            "--voltage",
            "3.3",
            "--current",
            "0.5",
        ])
        .expect("encode args should parse");

        let Command::Encode(args) = cli.command else {
            panic!("expected encode");
        };
        assert!(matches!(args.intent, Intent::SetV(_)));
    }

    #[test]
    fn global_format_after_subcommand() {
        let cli = Cli::try_parse_from(["mdpwire", "encode", "heartbeat", "--format", "json"])
            .expect("global flag should parse after subcommand");
        assert!(matches!(cli.format, Some(OutputFormat::Json)));
    }
}
