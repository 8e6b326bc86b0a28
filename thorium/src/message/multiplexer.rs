//! Small-message coalescing at the transport boundary.
//!
//! Messages bound for the same remote node are packed into one wire frame
//! `[count | (len, message)*]` until the frame reaches capacity or the
//! engine's poll loop flushes it. Messages whose encoded size exceeds the
//! threshold bypass coalescing as a count=1 frame, emitted after any pending
//! frame for that node, so per-(source, destination) order is preserved.
//! The receive side de-multiplexes transparently.

// Layer 1: Standard library imports
use std::collections::HashMap;

// Layer 2: Third-party crate imports
use bytes::{Buf, BufMut, Bytes, BytesMut};

// Layer 3: Internal module imports
use super::codec::{self, CodecError, MessageHeader};
use super::message::Message;
use crate::util::NodeId;

/// Default bypass threshold: messages encoding larger than this travel
/// alone.
pub const DEFAULT_THRESHOLD: usize = 512;

/// Default frame capacity: a frame reaching this size flushes immediately.
pub const DEFAULT_FRAME_CAPACITY: usize = 8192;

const COUNT_PREFIX_LEN: usize = 4;
const ENTRY_PREFIX_LEN: usize = 4;

struct PendingFrame {
    data: BytesMut,
    count: u32,
}

impl PendingFrame {
    fn new() -> Self {
        let mut data = BytesMut::new();
        data.put_u32_le(0);
        Self { data, count: 0 }
    }

    fn push(&mut self, message: &Message) {
        self.data.put_u32_le(codec::encoded_len(message) as u32);
        codec::encode_into(message, &mut self.data);
        self.count += 1;
    }

    fn seal(mut self) -> Bytes {
        let count = self.count;
        self.data[..COUNT_PREFIX_LEN].copy_from_slice(&count.to_le_bytes());
        self.data.freeze()
    }
}

/// Coalesces outbound messages per destination node.
pub struct MessageMultiplexer {
    threshold: usize,
    frame_capacity: usize,
    pending: HashMap<i32, PendingFrame>,
    frames_flushed: u64,
    messages_multiplexed: u64,
}

impl MessageMultiplexer {
    /// Create a multiplexer with the given bypass threshold and frame
    /// capacity (both in bytes).
    pub fn new(threshold: usize, frame_capacity: usize) -> Self {
        Self {
            threshold,
            frame_capacity,
            pending: HashMap::new(),
            frames_flushed: 0,
            messages_multiplexed: 0,
        }
    }

    /// Queue `message` for `destination`, appending any frames that became
    /// ready to `ready`.
    pub fn push(&mut self, destination: NodeId, message: &Message, ready: &mut Vec<(NodeId, Bytes)>) {
        let encoded = codec::encoded_len(message);

        if encoded > self.threshold {
            // Order: anything already coalesced for this node leaves first.
            if let Some(frame) = self.pending.remove(&destination.value()) {
                self.frames_flushed += 1;
                ready.push((destination, frame.seal()));
            }
            let mut frame = PendingFrame::new();
            frame.push(message);
            self.frames_flushed += 1;
            ready.push((destination, frame.seal()));
            return;
        }

        let frame = self
            .pending
            .entry(destination.value())
            .or_insert_with(PendingFrame::new);
        frame.push(message);
        self.messages_multiplexed += 1;

        if frame.data.len() >= self.frame_capacity {
            if let Some(frame) = self.pending.remove(&destination.value()) {
                self.frames_flushed += 1;
                ready.push((destination, frame.seal()));
            }
        }
    }

    /// Flush every pending frame, appending them to `ready`.
    pub fn flush_all(&mut self, ready: &mut Vec<(NodeId, Bytes)>) {
        let mut destinations: Vec<i32> = self.pending.keys().copied().collect();
        destinations.sort_unstable();
        for destination in destinations {
            if let Some(frame) = self.pending.remove(&destination) {
                self.frames_flushed += 1;
                ready.push((NodeId::new(destination), frame.seal()));
            }
        }
    }

    /// Whether any frame is waiting for a flush.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Frames emitted so far.
    pub fn frames_flushed(&self) -> u64 {
        self.frames_flushed
    }

    /// Messages that rode a coalesced frame.
    pub fn messages_multiplexed(&self) -> u64 {
        self.messages_multiplexed
    }
}

impl Default for MessageMultiplexer {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD, DEFAULT_FRAME_CAPACITY)
    }
}

/// Split a multiplexer frame into its messages, in transmission order.
pub fn demultiplex(frame: &[u8]) -> Result<Vec<(MessageHeader, &[u8])>, CodecError> {
    if frame.len() < COUNT_PREFIX_LEN {
        return Err(CodecError::Truncated {
            needed: COUNT_PREFIX_LEN,
            available: frame.len(),
        });
    }
    let mut cursor = frame;
    let count = cursor.get_u32_le() as usize;
    let mut messages = Vec::with_capacity(count);

    for _ in 0..count {
        if cursor.remaining() < ENTRY_PREFIX_LEN {
            return Err(CodecError::Truncated {
                needed: ENTRY_PREFIX_LEN,
                available: cursor.remaining(),
            });
        }
        let entry_len = cursor.get_u32_le() as usize;
        if cursor.remaining() < entry_len {
            return Err(CodecError::Truncated {
                needed: entry_len,
                available: cursor.remaining(),
            });
        }
        let entry = &cursor[..entry_len];
        messages.push(codec::decode(entry)?);
        cursor.advance(entry_len);
    }

    Ok(messages)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::util::ActorName;

    fn small(tag: i32) -> Message {
        Message::new(tag, ActorName::new(1), ActorName::new(2), vec![0u8; 8])
    }

    #[test]
    fn test_coalesces_until_flush() {
        let mut mux = MessageMultiplexer::default();
        let mut ready = Vec::new();

        for tag in 0..3 {
            mux.push(NodeId::new(1), &small(tag), &mut ready);
        }
        assert!(ready.is_empty());
        assert!(mux.has_pending());

        mux.flush_all(&mut ready);
        assert_eq!(ready.len(), 1);

        let messages = demultiplex(&ready[0].1).unwrap();
        let tags: Vec<i32> = messages.iter().map(|(h, _)| h.tag).collect();
        assert_eq!(tags, vec![0, 1, 2]);
        assert_eq!(mux.messages_multiplexed(), 3);
    }

    #[test]
    fn test_large_message_bypasses_after_pending() {
        let mut mux = MessageMultiplexer::new(64, 8192);
        let mut ready = Vec::new();

        mux.push(NodeId::new(1), &small(10), &mut ready);
        let big = Message::new(11, ActorName::new(1), ActorName::new(2), vec![0u8; 256]);
        mux.push(NodeId::new(1), &big, &mut ready);

        // The coalesced frame leaves first, then the bypass frame.
        assert_eq!(ready.len(), 2);
        let first = demultiplex(&ready[0].1).unwrap();
        let second = demultiplex(&ready[1].1).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].0.tag, 10);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].0.tag, 11);
        assert_eq!(second[0].1.len(), 256);
    }

    #[test]
    fn test_capacity_reached_flushes() {
        let mut mux = MessageMultiplexer::new(512, 128);
        let mut ready = Vec::new();

        // Each entry is 4 + 16 + 8 = 28 bytes; five entries cross 128.
        for tag in 0..5 {
            mux.push(NodeId::new(3), &small(tag), &mut ready);
        }
        assert_eq!(ready.len(), 1);
        let messages = demultiplex(&ready[0].1).unwrap();
        assert_eq!(messages.len(), 5);
    }

    #[test]
    fn test_per_destination_frames() {
        let mut mux = MessageMultiplexer::default();
        let mut ready = Vec::new();
        mux.push(NodeId::new(1), &small(1), &mut ready);
        mux.push(NodeId::new(2), &small(2), &mut ready);
        mux.flush_all(&mut ready);
        assert_eq!(ready.len(), 2);
        let destinations: Vec<i32> = ready.iter().map(|(n, _)| n.value()).collect();
        assert_eq!(destinations, vec![1, 2]);
    }

    #[test]
    fn test_demultiplex_rejects_truncated_frame() {
        let mut mux = MessageMultiplexer::default();
        let mut ready = Vec::new();
        mux.push(NodeId::new(1), &small(1), &mut ready);
        mux.flush_all(&mut ready);
        let frame = &ready[0].1;
        assert!(demultiplex(&frame[..frame.len() - 3]).is_err());
    }
}
