use std::fmt;
use std::io;

use mdpwire_packet::{EncodeError, PacketError};

// Exit codes follow sysexits where one fits.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

/// Rejected command parameters are a usage problem.
pub fn encode_error(context: &str, err: EncodeError) -> CliError {
    match err {
        EncodeError::Frame(other) => CliError::new(INTERNAL, format!("{context}: {other}")),
        other => CliError::usage(format!("{context}: {other}")),
    }
}

pub fn packet_error(context: &str, err: PacketError) -> CliError {
    match err {
        PacketError::Io(source) => io_error(context, source),
        PacketError::Decode(err) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        PacketError::Encode(err) => encode_error(context, err),
    }
}
