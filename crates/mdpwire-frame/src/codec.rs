use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use crate::assembler::{take_candidate, AssemblerConfig};
use crate::diagnostics::Diagnostics;
use crate::error::FrameError;
use crate::frame::{encode_frame, Frame};

/// `tokio_util` codec yielding candidate frames from a byte stream.
///
/// Decoding runs the same assembly pass as [`crate::FrameAssembler`]; the
/// `Framed` read buffer takes the place of the assembler's own buffer.
#[derive(Debug, Clone, Default)]
pub struct FrameCodec {
    config: AssemblerConfig,
    diagnostics: Diagnostics,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AssemblerConfig) -> Self {
        Self {
            config,
            diagnostics: Diagnostics::none(),
        }
    }

    /// Emit assembler diagnostics into `diagnostics`.
    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let config = &self.config;
        Ok(self.diagnostics.in_scope(|| take_candidate(src, config)))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if !src.is_empty() {
            let dropped = src.len();
            src.clear();
            self.diagnostics
                .in_scope(|| debug!(dropped, "stream ended inside a frame, partial bytes dropped"));
        }
        Ok(None)
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(frame.kind, frame.channel, &frame.payload, dst)
    }
}

#[cfg(test)]
mod tests {
    use futures_util::{SinkExt, StreamExt};
    use tokio::io::AsyncWriteExt;
    use tokio_util::codec::{FramedRead, FramedWrite};

    use super::*;
    use crate::diagnostics::tests::CapturedLogs;
    use crate::frame::{parse_frame, BROADCAST_CHANNEL};

    fn wire(frames: &[Frame]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for frame in frames {
            encode_frame(frame.kind, frame.channel, &frame.payload, &mut buf).unwrap();
        }
        buf.to_vec()
    }

    fn sample() -> Vec<Frame> {
        vec![
            Frame::new(0x22, BROADCAST_CHANNEL, Bytes::new()),
            Frame::new(0x14, 3, vec![3u8]),
            Frame::new(0x15, BROADCAST_CHANNEL, vec![0x10u8]),
        ]
    }

    #[test]
    fn decode_waits_for_complete_frame() {
        let bytes = wire(&sample()[1..2]);
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&bytes[..5]);

        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(&bytes[5..]);
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame.as_ref(), bytes.as_slice());
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_eof_drops_partial_frame() {
        let logs = CapturedLogs::default();
        let bytes = wire(&sample()[1..2]);
        let mut codec = FrameCodec::new().with_diagnostics(logs.diagnostics());
        let mut buf = BytesMut::from(&bytes[..6]);

        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
        assert!(buf.is_empty());
        assert!(logs.text().contains("partial bytes dropped"));
    }

    #[tokio::test]
    async fn framed_read_yields_frames_in_order() {
        let frames = sample();
        let mut bytes = vec![0x00, 0x5A, 0x33];
        bytes.extend(wire(&frames));

        let mut framed = FramedRead::new(bytes.as_slice(), FrameCodec::new());
        let mut got = Vec::new();
        while let Some(frame) = framed.next().await {
            got.push(parse_frame(&frame.unwrap()).unwrap());
        }

        assert_eq!(got, frames);
    }

    #[tokio::test]
    async fn framed_read_across_small_writes() {
        let frames = sample();
        let bytes = wire(&frames);
        let (mut tx, rx) = tokio::io::duplex(4);

        let writer = tokio::spawn(async move {
            for chunk in bytes.chunks(3) {
                tx.write_all(chunk).await.unwrap();
            }
        });

        let framed = FramedRead::new(rx, FrameCodec::new());
        let got: Vec<Frame> = framed
            .map(|frame| parse_frame(&frame.unwrap()).unwrap())
            .collect()
            .await;
        writer.await.unwrap();

        assert_eq!(got, frames);
    }

    #[tokio::test]
    async fn framed_write_encodes_frames() {
        let mut framed = FramedWrite::new(Vec::new(), FrameCodec::new());

        framed
            .send(Frame::new(0x1A, 0, vec![0xE4, 0x0C, 0xF4, 0x01]))
            .await
            .unwrap();

        assert_eq!(
            framed.get_ref().as_slice(),
            &[0x5A, 0x5A, 0x1A, 0x0A, 0x00, 0x1D, 0xE4, 0x0C, 0xF4, 0x01]
        );
    }

    #[tokio::test]
    async fn framed_write_rejects_oversized_payload() {
        let mut framed = FramedWrite::new(Vec::new(), FrameCodec::new());

        let err = framed
            .send(Frame::new(0x11, 0, vec![0u8; 250]))
            .await
            .unwrap_err();

        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
    }
}
