//! Message plumbing: payload buffers, the message value type, the wire
//! codec, and the coalescing multiplexer.

pub mod buffer;
pub mod codec;
pub mod multiplexer;
pub mod payload;
pub mod tags;

mod message;

pub use buffer::{Buffer, PoolKind};
pub use codec::{CodecError, MessageHeader, MESSAGE_HEADER_LEN};
pub use message::Message;
pub use multiplexer::MessageMultiplexer;
