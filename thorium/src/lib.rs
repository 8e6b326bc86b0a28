//! # thorium - Distributed Actor Engine for Scientific Workloads
//!
//! Thorium multiplexes a large population of lightweight actors onto a
//! small pool of worker threads per node, routes messages between actors
//! on the same or different nodes through a pluggable transport, and
//! recycles fixed-size allocations through slab-style memory pools across
//! the message fast path. The originating use case is genomics assembly
//! pipelines running across a cluster, but the engine itself is
//! domain-agnostic: applications are built by registering *scripts* and
//! spawning actors of them.
//!
//! # Quick Start
//!
//! ```rust
//! use thorium::prelude::*;
//!
//! const GREET: i32 = 0x9000;
//!
//! struct Greeter;
//!
//! impl Behavior for Greeter {
//!     fn receive(&mut self, context: &mut ActorContext<'_>, message: &Message) {
//!         match message.tag() {
//!             tags::ACTOR_START => context.stop(),
//!             GREET => context.reply_empty(GREET),
//!             _ => {}
//!         }
//!     }
//! }
//!
//! fn main() -> Result<(), NodeError> {
//!     let config = NodeConfig::builder()
//!         .with_threads(2)
//!         .with_signal_handlers(false)
//!         .build()
//!         .map_err(NodeError::Configuration)?;
//!     let mut node = Node::new(config, LoopbackTransport::single())?;
//!
//!     node.register_script(Script::new(ScriptId::new(1), "greeter", || Box::new(Greeter)))?;
//!     node.spawn_initial(ScriptId::new(1))?;
//!     node.run()
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Node (main/transport thread)
//!  ├─ Worker Pool ── Worker 0 ── actors + mailboxes + ephemeral pool
//!  │               ├─ Worker 1 ── ...
//!  │               └─ Worker N
//!  ├─ Memory pools (inbound, outbound)
//!  ├─ Multiplexer (small-message coalescing)
//!  └─ Transport (frames between nodes)
//! ```
//!
//! - [`node`] - the per-process root: lifecycle, routing, spawn and death
//! - [`worker`] - the scheduling substrate driving actor receive steps
//! - [`actor`] - the behavior trait, script records, and receive context
//! - [`message`] - payload buffers, wire codec, and the multiplexer
//! - [`memory`] - slab-style pools beneath the message fast path
//! - [`transport`] - the boundary to the wire, plus the loopback fabric
//!
//! # Guarantees
//!
//! - Per (source actor, destination actor): FIFO delivery, end to end,
//!   local and remote, including across the multiplexer.
//! - An actor is processed by at most one worker at any instant; its state
//!   is touched only during a receive step on its owning worker.
//! - Spawn replies are observed before any message the spawner sends to
//!   the new actor.
//!
//! There is no ordering across distinct senders, no cross-node placement,
//! no persistence, and no per-actor fault isolation.

pub mod actor;
pub mod memory;
pub mod message;
pub mod node;
pub mod prelude;
pub mod transport;
pub mod util;
pub mod worker;

// Re-export commonly used types
pub use actor::{ActorContext, Behavior, Script, ScriptError, ScriptTable};
pub use memory::{MemoryBlock, MemoryPool};
pub use message::{Buffer, CodecError, Message, MessageMultiplexer, PoolKind};
pub use node::{
    CountersSnapshot, MemoryUsageReport, Node, NodeConfig, NodeConfigBuilder, NodeError, PoolUsage,
};
pub use transport::{LoopbackTransport, Transport, TransportError};
pub use util::{ActorName, NodeId, ScriptId, WorkerId};
pub use worker::WorkerPool;
