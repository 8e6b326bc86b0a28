//! Slab-style memory pools.
//!
//! A [`MemoryPool`] recycles fixed-size allocations across the message fast
//! path: small requests are bump-allocated from [`MemoryBlock`] slabs and
//! recycled through per-size-class free lists, while requests at or above
//! the block size go straight to the system allocator. Pools are
//! thread-confined; buffers that cross threads come home through the
//! triage queues, never through a concurrent `free`.

pub mod block;
pub mod pool;

pub use block::MemoryBlock;
pub use pool::MemoryPool;
