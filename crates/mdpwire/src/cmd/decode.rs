use std::fs::File;
use std::io::{self, Cursor, Read};

use mdpwire_packet::{Diagnostics, PacketError, PacketReader};

use crate::cmd::DecodeArgs;
use crate::exit::{io_error, packet_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::hexdump::parse_hex;
use crate::output::{print_decoded, DecodedRow, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let source: Box<dyn Read> = if let Some(hex) = &args.hex {
        let bytes = parse_hex(hex).map_err(|err| CliError::usage(format!("--hex: {err}")))?;
        Box::new(Cursor::new(bytes))
    } else if let Some(path) = &args.file {
        let file = File::open(path)
            .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?;
        Box::new(file)
    } else {
        Box::new(io::stdin().lock())
    };

    let rows = decode_stream(Chunked::new(source, usize::from(args.chunk)))?;
    let failed = rows.iter().filter(|row| row.error.is_some()).count();
    print_decoded(&rows, format);

    if failed > 0 {
        return Err(CliError::new(
            DATA_INVALID,
            format!("{failed} of {} frames failed to decode", rows.len()),
        ));
    }
    Ok(SUCCESS)
}

fn decode_stream<R: Read>(source: R) -> CliResult<Vec<DecodedRow>> {
    let reader = PacketReader::new(source).with_diagnostics(Diagnostics::current());
    let mut rows = Vec::new();
    for (index, item) in reader.enumerate() {
        match item {
            Ok(packet) => rows.push(DecodedRow::packet(index, packet)),
            Err(PacketError::Decode(err)) => rows.push(DecodedRow::error(index, &err)),
            Err(err) => return Err(packet_error("read failed", err)),
        }
    }
    Ok(rows)
}

/// Hands out at most `size` bytes per read, to replay a capture the way a
/// serial port would deliver it.
struct Chunked<R> {
    inner: R,
    size: usize,
}

impl<R: Read> Chunked<R> {
    fn new(inner: R, size: usize) -> Self {
        Self { inner, size }
    }
}

impl<R: Read> Read for Chunked<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len().min(self.size);
        self.inner.read(&mut buf[..len])
    }
}
