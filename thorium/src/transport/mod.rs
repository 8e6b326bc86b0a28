//! Transport boundary.
//!
//! The wire transport is external to the core; the engine only requires
//! ordered frame delivery per (sending node, receiving node) pair. The
//! node owns encoding, decoding, and multiplexing; frames are opaque to
//! the transport, and the core never assumes zero-copy.

pub mod loopback;
pub mod traits;

pub use loopback::LoopbackTransport;
pub use traits::{Transport, TransportError};
