use std::io::{ErrorKind, Write};
use std::thread;

use bytes::BytesMut;

use crate::error::{FrameError, Result};
use crate::frame::{encode_frame, Frame, MAX_FRAME_SIZE};

/// Writes complete frames to any `Write` stream.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(MAX_FRAME_SIZE),
        }
    }

    /// Write a complete frame (blocking).
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.send(frame.kind, frame.channel, frame.payload.as_ref())
    }

    /// Encode and send a payload with the given type and channel bytes.
    pub fn send(&mut self, kind: u8, channel: u8, payload: &[u8]) -> Result<()> {
        self.buf.clear();
        encode_frame(kind, channel, payload, &mut self.buf)?;
        self.write_encoded()
    }

    /// Send bytes that already carry a complete frame.
    pub fn write_raw(&mut self, frame: &[u8]) -> Result<()> {
        self.buf.clear();
        self.buf.extend_from_slice(frame);
        self.write_encoded()
    }

    fn write_encoded(&mut self) -> Result<()> {
        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                // Non-blocking port with a full output buffer.
                Err(err) if err.kind() == ErrorKind::WouldBlock => thread::yield_now(),
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => thread::yield_now(),
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::frame::{parse_frame, BROADCAST_CHANNEL, MAX_PAYLOAD};
    use crate::reader::FrameReader;

    fn written(writer: FrameWriter<Cursor<Vec<u8>>>) -> Vec<u8> {
        writer.into_inner().into_inner()
    }

    #[test]
    fn write_single_frame() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));

        writer.send(0x1A, 0, &[0xE4, 0x0C, 0xF4, 0x01]).unwrap();

        assert_eq!(
            written(writer),
            vec![0x5A, 0x5A, 0x1A, 0x0A, 0x00, 0x1D, 0xE4, 0x0C, 0xF4, 0x01]
        );
    }

    #[test]
    fn write_multiple_frames_reads_back() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));

        writer.send(0x17, BROADCAST_CHANNEL, &[]).unwrap();
        writer.send(0x16, 2, &[1]).unwrap();
        writer
            .write_frame(&Frame::new(0x18, 4, vec![1, 2, 3, 4, 5, 40]))
            .unwrap();

        let reader = FrameReader::new(Cursor::new(written(writer)));
        let frames: Vec<Frame> = reader
            .map(|bytes| parse_frame(&bytes.unwrap()).unwrap())
            .collect();

        assert_eq!(frames.len(), 3);
        assert_eq!((frames[0].kind, frames[0].channel), (0x17, BROADCAST_CHANNEL));
        assert_eq!((frames[1].kind, frames[1].channel), (0x16, 2));
        assert_eq!(frames[2].payload.as_ref(), &[1, 2, 3, 4, 5, 40]);
    }

    #[test]
    fn payload_too_large_rejected() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));

        let err = writer.send(0x11, 0, &[0u8; MAX_PAYLOAD + 1]).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
        assert!(written(writer).is_empty());
    }

    #[test]
    fn write_raw_passes_bytes_through() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        let heartbeat = [0x5A, 0x5A, 0x22, 0x06, 0xEE, 0x00];

        writer.write_raw(&heartbeat).unwrap();

        assert_eq!(written(writer), heartbeat.to_vec());
    }

    #[test]
    fn flush_propagates() {
        let sink = FlushTrackingWriter::default();
        let flag = Arc::clone(&sink.flushed);
        let mut writer = FrameWriter::new(sink);

        writer.send(0x22, BROADCAST_CHANNEL, &[]).unwrap();

        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn handles_interrupted_write_and_flush() {
        let mut writer = FrameWriter::new(FlakyWriter::new(ErrorKind::Interrupted));
        writer.send(0x20, BROADCAST_CHANNEL, &[1]).unwrap();

        let inner = writer.into_inner();
        assert_eq!(inner.data.len(), 7);
    }

    #[test]
    fn handles_would_block_write_and_flush() {
        let mut writer = FrameWriter::new(FlakyWriter::new(ErrorKind::WouldBlock));
        writer.send(0x20, BROADCAST_CHANNEL, &[0]).unwrap();

        let inner = writer.into_inner();
        assert_eq!(inner.data.len(), 7);
    }

    #[test]
    fn waits_out_a_full_output_buffer() {
        let mut writer = FrameWriter::new(FullBufferWriter {
            blocked: 50,
            attempts: 0,
            data: Vec::new(),
        });
        writer.send(0x1A, 0, &[0xE4, 0x0C, 0xF4, 0x01]).unwrap();

        let inner = writer.into_inner();
        assert_eq!(inner.attempts, 51);
        assert_eq!(
            inner.data,
            vec![0x5A, 0x5A, 0x1A, 0x0A, 0x00, 0x1D, 0xE4, 0x0C, 0xF4, 0x01]
        );
    }

    #[test]
    fn connection_closed_when_write_returns_zero() {
        let mut writer = FrameWriter::new(ZeroWriter);
        let err = writer.send(0x22, BROADCAST_CHANNEL, &[]).unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));

        let _ = writer.get_ref();
        let _ = writer.get_mut();
        let _inner = writer.into_inner();
    }

    #[derive(Default)]
    struct FlushTrackingWriter {
        flushed: Arc<AtomicBool>,
        data: Vec<u8>,
    }

    impl Write for FlushTrackingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Fails the first write and the first flush with `kind`.
    struct FlakyWriter {
        kind: ErrorKind,
        wrote_once: bool,
        flushed_once: bool,
        data: Vec<u8>,
    }

    impl FlakyWriter {
        fn new(kind: ErrorKind) -> Self {
            Self {
                kind,
                wrote_once: false,
                flushed_once: false,
                data: Vec::new(),
            }
        }
    }

    impl Write for FlakyWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.wrote_once {
                self.wrote_once = true;
                return Err(std::io::Error::from(self.kind));
            }
            // Short writes exercise the offset loop.
            let n = buf.len().min(3);
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if !self.flushed_once {
                self.flushed_once = true;
                return Err(std::io::Error::from(self.kind));
            }
            Ok(())
        }
    }

    /// Reports `WouldBlock` for the first `blocked` writes.
    struct FullBufferWriter {
        blocked: usize,
        attempts: usize,
        data: Vec<u8>,
    }

    impl Write for FullBufferWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.attempts += 1;
            if self.attempts <= self.blocked {
                return Err(std::io::Error::from(ErrorKind::WouldBlock));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
