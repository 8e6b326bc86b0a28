//! Actors: the behavior trait, script records, actor cells, and the
//! receive-step context.

pub mod cell;
pub mod context;
pub mod script;

pub use cell::ActorCell;
pub use context::ActorContext;
pub use script::{Behavior, Script, ScriptError, ScriptTable};
