//! Host and simulated device talking over an in-memory duplex pipe.
//!
//! Run with:
//!   cargo run --example async-loopback --features async

use futures_util::{SinkExt, StreamExt};
use mdpwire::packet::{
    Command, DeviceInfo, Message, PacketCodec, PacketEncoder, Report, BROADCAST_CHANNEL,
};
use tokio::io::AsyncWriteExt;
use tokio_util::codec::{FramedRead, FramedWrite};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (host_io, device_io) = tokio::io::duplex(256);
    let (host_rx, host_tx) = tokio::io::split(host_io);
    let (device_rx, mut device_tx) = tokio::io::split(device_io);

    // The device answers get_machine and acknowledges channel selection.
    let device = tokio::spawn(async move {
        let encoder = PacketEncoder::new();
        let mut commands = FramedRead::new(device_rx, PacketCodec::new());
        while let Some(item) = commands.next().await {
            let Ok(Ok(packet)) = item else { continue };
            let reply = match packet.message {
                Message::Command(Command::GetMachine) => {
                    Report::DeviceInfo(DeviceInfo::from_raw(0x10))
                }
                Message::Command(Command::SelectChannel { channel }) => {
                    Report::ChannelSwitch { channel }
                }
                _ => continue,
            };
            let bytes = encoder.encode_report(BROADCAST_CHANNEL, &reply)?;
            device_tx.write_all(&bytes).await?;
        }
        Ok::<_, Box<dyn std::error::Error + Send + Sync>>(())
    });

    let mut host_tx = FramedWrite::new(host_tx, PacketCodec::new());
    let mut host_rx = FramedRead::new(host_rx, PacketCodec::new());

    host_tx.send(Command::GetMachine).await?;
    host_tx.send(Command::SelectChannel { channel: 2 }).await?;

    for _ in 0..2 {
        match host_rx.next().await {
            Some(Ok(Ok(packet))) => println!("device replied: {:?}", packet.message),
            Some(Ok(Err(err))) => eprintln!("dropped frame: {err}"),
            Some(Err(err)) => return Err(err.into()),
            None => break,
        }
    }

    host_tx.close().await?;
    device.await?.map_err(|err| err.to_string())?;
    Ok(())
}
