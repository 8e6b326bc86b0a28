// Layer 1: Standard library imports
use std::collections::VecDeque;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use bytes::Bytes;
use parking_lot::Mutex;

// Layer 3: Internal module imports
use super::traits::{Transport, TransportError};
use crate::util::NodeId;

type FrameQueue = Mutex<VecDeque<(NodeId, Bytes)>>;

/// In-process transport: a hub of per-node frame FIFOs.
///
/// Serves as the default transport for single-node runs and as the
/// multi-node fabric in tests. Per-pair frame order is preserved because
/// each destination has one FIFO and senders append under its lock.
///
/// # Example
/// ```rust
/// use thorium::transport::{LoopbackTransport, Transport};
/// use thorium::util::NodeId;
///
/// let mut cluster = LoopbackTransport::cluster(2);
/// let mut node1 = cluster.remove(1);
/// let mut node0 = cluster.remove(0);
///
/// node0.send(NodeId::new(1), bytes::Bytes::from_static(b"frame")).unwrap();
/// let (from, frame) = node1.poll().unwrap();
/// assert_eq!(from, NodeId::new(0));
/// assert_eq!(&frame[..], b"frame");
/// ```
pub struct LoopbackTransport {
    node_id: NodeId,
    hub: Arc<Vec<FrameQueue>>,
}

impl LoopbackTransport {
    /// Build `nodes` connected endpoints; index `i` is node `i`'s
    /// transport.
    pub fn cluster(nodes: usize) -> Vec<LoopbackTransport> {
        let hub: Arc<Vec<FrameQueue>> = Arc::new(
            (0..nodes)
                .map(|_| Mutex::new(VecDeque::new()))
                .collect(),
        );
        (0..nodes)
            .map(|id| LoopbackTransport {
                node_id: NodeId::new(id as i32),
                hub: Arc::clone(&hub),
            })
            .collect()
    }

    /// A single-node endpoint (no peers).
    pub fn single() -> LoopbackTransport {
        let mut cluster = Self::cluster(1);
        cluster.remove(0)
    }
}

impl Transport for LoopbackTransport {
    fn node_id(&self) -> NodeId {
        self.node_id
    }

    fn node_count(&self) -> i32 {
        self.hub.len() as i32
    }

    fn send(&mut self, destination: NodeId, frame: Bytes) -> Result<(), TransportError> {
        let index = destination.value();
        if index < 0 || index as usize >= self.hub.len() {
            return Err(TransportError::UnknownNode(destination));
        }
        self.hub[index as usize]
            .lock()
            .push_back((self.node_id, frame));
        Ok(())
    }

    fn poll(&mut self) -> Option<(NodeId, Bytes)> {
        self.hub[self.node_id.value() as usize].lock().pop_front()
    }
}
