//! Node-level error types.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::actor::ScriptError;
use crate::transport::TransportError;
use crate::util::{ActorName, NodeId, ScriptId};

/// Errors surfaced at the boundary of the engine.
///
/// Errors inside the critical path (routing, the worker loop) are recorded
/// in counters and logged instead; escalating them would compromise the
/// liveness of unrelated actors.
#[derive(Error, Debug)]
pub enum NodeError {
    /// Spawn requested for a script id nobody registered.
    #[error("unknown script on spawn: {0}")]
    UnknownScript(ScriptId),

    /// Operation addressed to a name that is not a live local actor.
    #[error("unknown actor: {0}")]
    UnknownActor(ActorName),

    /// Script registration failure.
    #[error("script registration: {0}")]
    Script(#[from] ScriptError),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The configured node identity disagrees with the transport's.
    #[error("node identity mismatch: configured {configured}, transport reports {transport}")]
    IdentityMismatch {
        configured: NodeId,
        transport: NodeId,
    },

    /// The transport failed underneath the node.
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    /// A worker thread could not be started.
    #[error("failed to start worker thread: {0}")]
    WorkerSpawn(#[from] std::io::Error),
}

impl NodeError {
    /// Whether the process cannot reasonably continue.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            NodeError::Transport(_) | NodeError::WorkerSpawn(_)
        )
    }

    /// Whether the error is a boot-time configuration problem.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            NodeError::UnknownScript(_)
                | NodeError::Script(_)
                | NodeError::Configuration(_)
                | NodeError::IdentityMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_script_display() {
        let error = NodeError::UnknownScript(ScriptId::new(0x99));
        assert!(error.to_string().contains("unknown script"));
    }

    #[test]
    fn test_script_error_conversion() {
        let error: NodeError = ScriptError::Duplicate(ScriptId::new(1)).into();
        assert!(matches!(error, NodeError::Script(_)));
        assert!(error.is_configuration());
        assert!(!error.is_fatal());
    }

    #[test]
    fn test_transport_errors_are_fatal() {
        let error: NodeError = TransportError::UnknownNode(NodeId::new(9)).into();
        assert!(error.is_fatal());
    }
}
