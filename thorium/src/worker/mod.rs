//! The scheduling substrate: per-worker event queues, the worker loop, and
//! the worker pool.

pub mod pool;
pub mod queue;
pub mod shared;
pub mod worker;

pub use pool::WorkerPool;
pub(crate) use queue::{InboundQueue, WorkerEvent};
pub(crate) use shared::WorkerShared;
