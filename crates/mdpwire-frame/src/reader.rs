use std::io::{ErrorKind, Read};

use bytes::Bytes;

use crate::assembler::{AssemblerConfig, FrameAssembler};
use crate::diagnostics::Diagnostics;
use crate::error::{FrameError, Result};

const READ_CHUNK_SIZE: usize = 256;

/// Reads candidate frames from any `Read` stream.
///
/// Handles chunking and noise internally; callers always get one whole
/// candidate frame per call, still to be validated by the decoder.
pub struct FrameReader<T> {
    inner: T,
    assembler: FrameAssembler,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, AssemblerConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: AssemblerConfig) -> Self {
        Self {
            inner,
            assembler: FrameAssembler::with_config(config),
        }
    }

    /// Emit assembler diagnostics into `diagnostics`.
    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.assembler = self.assembler.with_diagnostics(diagnostics);
        self
    }

    /// Read the next candidate frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_frame(&mut self) -> Result<Bytes> {
        loop {
            if let Some(frame) = self.assembler.next_frame() {
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.assembler.push(&chunk[..read]);
        }
    }

    /// Bytes buffered but not yet part of a complete frame.
    pub fn pending(&self) -> usize {
        self.assembler.buffered()
    }

    /// Forget any partially received frame.
    pub fn reset(&mut self) {
        self.assembler.clear();
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current assembler configuration.
    pub fn config(&self) -> &AssemblerConfig {
        self.assembler.config()
    }
}

impl<T: Read> Iterator for FrameReader<T> {
    type Item = Result<Bytes>;

    /// Yields frames until the stream ends; EOF ends the iteration.
    fn next(&mut self) -> Option<Self::Item> {
        match self.read_frame() {
            Ok(frame) => Some(Ok(frame)),
            Err(FrameError::ConnectionClosed) => None,
            Err(err) => Some(Err(err)),
        }
    }
}
