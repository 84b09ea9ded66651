//! Replay a raw serial capture and print every packet it contains.
//!
//! Run with:
//!   cargo run --example replay-capture -- capture.bin

use std::fs::File;

use mdpwire::packet::{Message, PacketError, PacketReader, Report};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .ok_or("usage: replay-capture <capture.bin>")?;
    let reader = PacketReader::new(File::open(&path)?);

    let mut dropped = 0usize;
    for item in reader {
        let packet = match item {
            Ok(packet) => packet,
            Err(PacketError::Decode(err)) => {
                dropped += 1;
                eprintln!("dropped frame: {err}");
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        match &packet.message {
            Message::Report(Report::Synthesize(snapshot)) => {
                for channel in snapshot.online_channels() {
                    println!(
                        "ch{} {:?} out {:.3} V {:.3} A ({:.2} W) {:.1} C",
                        channel.num,
                        channel.mode,
                        channel.output.voltage,
                        channel.output.current,
                        channel.output_power(),
                        channel.temperature
                    );
                }
            }
            Message::Report(Report::Wave(wave)) => {
                for (timestamp, sample) in wave.samples() {
                    println!(
                        "wave ch{} t={timestamp} {:.3} V {:.3} A",
                        packet.channel, sample.voltage, sample.current
                    );
                }
            }
            other => println!("ch{:#04x} {other:?}", packet.channel),
        }
    }

    eprintln!("{dropped} frames dropped");
    Ok(())
}
