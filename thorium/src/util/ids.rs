// Layer 1: Standard library imports
use std::fmt::{self, Display};

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
// (none)

/// Cluster-unique actor identifier.
///
/// Actor names are plain 32-bit integers, generated so that
/// `name mod nodes` recovers the owning node without any lookup. Names are
/// never reused within a run; indices are (see the node's dead-index queue).
///
/// # Example
/// ```rust
/// use thorium::util::{ActorName, NodeId};
///
/// // With 4 nodes, name 10 lives on node 2.
/// let name = ActorName::new(10);
/// assert_eq!(name.node(4), NodeId::new(2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorName(i32);

impl ActorName {
    /// The absent actor: spawn failures and unset supervisors.
    pub const NOBODY: ActorName = ActorName(-1);

    /// Wrap a raw name value.
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    /// The raw integer value.
    pub const fn value(&self) -> i32 {
        self.0
    }

    /// The node owning this actor, recovered by congruence.
    pub fn node(&self, nodes: i32) -> NodeId {
        NodeId::new(self.0.rem_euclid(nodes))
    }
}

impl Display for ActorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor/{}", self.0)
    }
}

/// Identifier of a registered script (actor behavior descriptor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScriptId(i32);

impl ScriptId {
    /// Wrap a raw script identifier.
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    /// The raw integer value.
    pub const fn value(&self) -> i32 {
        self.0
    }
}

impl Display for ScriptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "script/{:#x}", self.0)
    }
}

/// Identifier of a node (process) in the cluster, in `0..nodes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(i32);

impl NodeId {
    /// Wrap a raw node identifier.
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    /// The raw integer value.
    pub const fn value(&self) -> i32 {
        self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node/{}", self.0)
    }
}

/// Index of a worker thread within one node's worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkerId(usize);

impl WorkerId {
    /// Wrap a raw worker index.
    pub const fn new(value: usize) -> Self {
        Self(value)
    }

    /// The raw index value.
    pub const fn value(&self) -> usize {
        self.0
    }
}

impl Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker/{}", self.0)
    }
}
