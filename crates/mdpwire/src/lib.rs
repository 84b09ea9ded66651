//! Wire-protocol codec for Miniware MDP power supplies and loads.
//!
//! The protocol runs over a serial link that delivers bytes in arbitrary
//! chunks. This crate turns that byte stream into typed packets and turns
//! command intents back into frames.
//!
//! # Crate Structure
//!
//! - [`frame`]: magic sync, XOR checksum, frame assembly and blocking I/O
//! - [`packet`]: per-type payload layouts, typed records, decoder and encoder

/// Re-export frame types.
pub mod frame {
    pub use mdpwire_frame::*;
}

/// Re-export packet types.
pub mod packet {
    pub use mdpwire_packet::*;
}
