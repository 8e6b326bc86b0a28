//! Wire codec for single messages.
//!
//! A wire message is `[header | payload]`. The header is four little-endian
//! 32-bit fields: source name, destination name, tag, payload length.
//! Decode is the exact inverse of encode; a malformed frame is a
//! [`CodecError`], counted and dropped by the caller.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;

// Layer 3: Internal module imports
use super::message::Message;
use crate::util::ActorName;

/// Encoded header length in bytes.
pub const MESSAGE_HEADER_LEN: usize = 16;

/// Decoded wire-message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    /// Sending actor name.
    pub source: ActorName,
    /// Destination actor name.
    pub destination: ActorName,
    /// Action code.
    pub tag: i32,
    /// Payload length in bytes.
    pub count: u32,
}

/// Wire decode failures.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodecError {
    /// The frame ended before the field being read.
    #[error("truncated frame: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    /// The header declared more payload than the frame carries.
    #[error("payload length mismatch: declared {declared}, {available} available")]
    PayloadLength { declared: usize, available: usize },
}

/// Number of bytes `encode_into` will produce for `message`.
pub fn encoded_len(message: &Message) -> usize {
    MESSAGE_HEADER_LEN + message.count()
}

/// Append the wire form of `message` to `out`.
pub fn encode_into(message: &Message, out: &mut BytesMut) {
    out.reserve(encoded_len(message));
    out.put_i32_le(message.source().value());
    out.put_i32_le(message.destination().value());
    out.put_i32_le(message.tag());
    out.put_u32_le(message.count() as u32);
    out.put_slice(message.payload());
}

/// Decode one wire message, returning the header and the payload slice.
pub fn decode(frame: &[u8]) -> Result<(MessageHeader, &[u8]), CodecError> {
    if frame.len() < MESSAGE_HEADER_LEN {
        return Err(CodecError::Truncated {
            needed: MESSAGE_HEADER_LEN,
            available: frame.len(),
        });
    }
    let mut cursor = frame;
    let source = ActorName::new(cursor.get_i32_le());
    let destination = ActorName::new(cursor.get_i32_le());
    let tag = cursor.get_i32_le();
    let count = cursor.get_u32_le();

    let payload = &frame[MESSAGE_HEADER_LEN..];
    if payload.len() < count as usize {
        return Err(CodecError::PayloadLength {
            declared: count as usize,
            available: payload.len(),
        });
    }
    let header = MessageHeader {
        source,
        destination,
        tag,
        count,
    };
    Ok((header, &payload[..count as usize]))
}
