//! Prelude module for convenient imports.
//!
//! Re-exports the types most applications touch:
//!
//! ```rust
//! use thorium::prelude::*;
//! ```
//!
//! ## Actors
//! - [`Behavior`] - the receive/lifecycle trait actors implement
//! - [`Script`] - the registered behavior descriptor
//! - [`ActorContext`] - the engine API during a receive step
//!
//! ## Messaging
//! - [`Message`] - tag, source, destination, payload
//! - [`Buffer`] - payload storage
//! - [`tags`] - the reserved action tags
//!
//! ## Node
//! - [`Node`], [`NodeConfig`], [`NodeError`]
//!
//! ## Transport
//! - [`Transport`], [`LoopbackTransport`]
//!
//! ## Identifiers
//! - [`ActorName`], [`ScriptId`], [`NodeId`], [`WorkerId`]

pub use crate::actor::{ActorContext, Behavior, Script};
pub use crate::message::{tags, Buffer, Message};
pub use crate::node::{Node, NodeConfig, NodeError};
pub use crate::transport::{LoopbackTransport, Transport};
pub use crate::util::{ActorName, NodeId, ScriptId, WorkerId};
