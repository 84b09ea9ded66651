use std::ops::RangeInclusive;

use bytes::{Buf, Bytes, BytesMut};
use tracing::{debug, trace, warn};

use crate::diagnostics::Diagnostics;
use crate::frame::{HEADER_SIZE, MAGIC, SIZE_INDEX, TYPE_INDEX};

/// Default number of unmatched bytes kept before the buffer is dropped.
pub const DEFAULT_DISCARD_BOUND: usize = 256;

/// Lowest and highest packet type codes the MDP family uses.
pub const DEFAULT_KNOWN_TYPES: RangeInclusive<u8> = 0x11..=0x23;

const INITIAL_BUFFER_CAPACITY: usize = 512;

/// Magic + type + size.
const PEEK_LEN: usize = 4;

/// Configuration for the frame assembler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblerConfig {
    /// When no magic sequence is buffered and more than this many bytes are
    /// pending, the buffer is dropped. Headers declaring a larger frame are
    /// implausible, so a partial frame never holds more than this either.
    /// Default: 256.
    pub discard_bound: usize,
    /// Smallest plausible size byte. Default: 6 (header only).
    pub min_frame_size: u8,
    /// Largest plausible size byte. Default: 255.
    pub max_frame_size: u8,
    /// Type codes a header may carry. Default: `0x11..=0x23`.
    pub known_types: RangeInclusive<u8>,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            discard_bound: DEFAULT_DISCARD_BOUND,
            min_frame_size: HEADER_SIZE as u8,
            max_frame_size: u8::MAX,
            known_types: DEFAULT_KNOWN_TYPES,
        }
    }
}

impl AssemblerConfig {
    /// Whether a type/size pair read after a magic match can start a frame.
    pub fn is_plausible(&self, kind: u8, size: u8) -> bool {
        self.known_types.contains(&kind)
            && (self.min_frame_size..=self.max_frame_size).contains(&size)
            && usize::from(size) <= self.discard_bound
    }
}

/// Turns a chunked, possibly noisy byte stream into candidate frames.
///
/// Candidates have a magic match, a plausible header and exactly `size`
/// bytes; checksum and layout are left to the packet decoder.
pub struct FrameAssembler {
    buf: BytesMut,
    config: AssemblerConfig,
    diagnostics: Diagnostics,
}

impl FrameAssembler {
    /// Create an assembler with default configuration and silent diagnostics.
    pub fn new() -> Self {
        Self::with_config(AssemblerConfig::default())
    }

    /// Create an assembler with explicit configuration.
    pub fn with_config(config: AssemblerConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
            diagnostics: Diagnostics::none(),
        }
    }

    /// Emit diagnostics into `diagnostics` instead of discarding them.
    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Buffer `data` and return every candidate frame now complete, in order.
    pub fn append(&mut self, data: &[u8]) -> Vec<Bytes> {
        self.push(data);
        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame() {
            frames.push(frame);
        }
        frames
    }

    /// Buffer `data` without assembling; pull frames with [`Self::next_frame`].
    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Take the next complete candidate frame already buffered, if any.
    pub fn next_frame(&mut self) -> Option<Bytes> {
        let Self {
            buf,
            config,
            diagnostics,
        } = self;
        diagnostics.in_scope(|| take_candidate(buf, config))
    }

    /// Number of bytes waiting for more input.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Drop all pending bytes (e.g. on disconnect).
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Current assembler configuration.
    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

/// Run one assembly pass over `buf`.
///
/// Returns `None` when more input is needed. On success the frame bytes are
/// consumed from the head of the buffer; garbage and false headers ahead of
/// it are consumed too.
pub fn take_candidate(buf: &mut BytesMut, config: &AssemblerConfig) -> Option<Bytes> {
    loop {
        let Some(start) = find_magic(buf) else {
            if buf.len() > config.discard_bound {
                // A trailing 0x5A may be the first half of a split magic.
                let keep = usize::from(buf.last() == Some(&MAGIC[0]));
                let dropped = buf.len() - keep;
                buf.advance(dropped);
                warn!(dropped, "no frame header within discard bound, buffer dropped");
            }
            return None;
        };

        if start > 0 {
            trace!(dropped = start, "skipping bytes ahead of frame header");
            buf.advance(start);
        }

        if buf.len() < PEEK_LEN {
            return None;
        }

        let kind = buf[TYPE_INDEX];
        let size = buf[SIZE_INDEX];
        if !config.is_plausible(kind, size) {
            debug!(kind, size, "implausible header after magic, resyncing");
            buf.advance(1);
            continue;
        }

        if buf.len() < size as usize {
            return None;
        }

        trace!(kind, size, "candidate frame");
        return Some(buf.split_to(size as usize).freeze());
    }
}

fn find_magic(buf: &[u8]) -> Option<usize> {
    buf.windows(MAGIC.len()).position(|window| window == MAGIC)
}
