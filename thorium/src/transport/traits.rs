// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use bytes::Bytes;
use thiserror::Error;

// Layer 3: Internal module imports
use crate::util::NodeId;

/// Transport failures at the engine boundary.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TransportError {
    /// The destination node is not part of this cluster.
    #[error("unknown destination node: {0}")]
    UnknownNode(NodeId),

    /// The link to the destination node is gone.
    #[error("connection to {0} closed")]
    Closed(NodeId),
}

/// The engine's obligation-free view of a wire transport.
///
/// Contract: frames submitted via `send` for one destination arrive at
/// that destination's `poll` in submission order; `poll` surfaces each
/// received frame exactly once together with its sending node. The node
/// assumes ownership of polled frames.
pub trait Transport: Send {
    /// This endpoint's node identity.
    fn node_id(&self) -> NodeId;

    /// Number of nodes in the cluster.
    fn node_count(&self) -> i32;

    /// Ship one frame to `destination`.
    fn send(&mut self, destination: NodeId, frame: Bytes) -> Result<(), TransportError>;

    /// Surface one received frame, or `None` when nothing is pending.
    fn poll(&mut self) -> Option<(NodeId, Bytes)>;
}
