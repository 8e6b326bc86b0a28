//! Shared utilities: identifier newtypes.

pub mod ids;

pub use ids::{ActorName, NodeId, ScriptId, WorkerId};
