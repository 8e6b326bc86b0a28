// Layer 1: Standard library imports
use std::fmt;
use std::ptr::NonNull;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
// (none)

/// Which node-level pool owns a pooled payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    /// The node's inbound-message pool (transport receive path).
    Inbound,
    /// The node's outbound-message pool (main-thread synthesized messages).
    Outbound,
}

/// Opaque message payload storage.
///
/// Actor-produced payloads are heap-backed vectors. Payloads on the
/// transport receive path, and payloads the node synthesizes on its main
/// thread, are slices carved from a [`crate::memory::MemoryPool`]; such
/// buffers carry their pool of origin so the triage machinery can return
/// them on the pool-owning thread. Ownership of a buffer transfers with
/// the message that carries it.
pub struct Buffer {
    repr: Repr,
}

enum Repr {
    Empty,
    Heap(Vec<u8>),
    Pooled {
        pointer: NonNull<u8>,
        len: usize,
        pool: PoolKind,
    },
}

impl Buffer {
    /// The empty payload.
    pub fn empty() -> Self {
        Self { repr: Repr::Empty }
    }

    /// Wrap a heap-backed payload.
    pub fn from_vec(data: Vec<u8>) -> Self {
        if data.is_empty() {
            return Self::empty();
        }
        Self {
            repr: Repr::Heap(data),
        }
    }

    /// Wrap `len` bytes carved from the pool identified by `pool`.
    ///
    /// The caller transfers ownership of the allocation; it is returned to
    /// the pool through triage, never dropped in place.
    pub(crate) fn pooled(pointer: NonNull<u8>, len: usize, pool: PoolKind) -> Self {
        debug_assert!(len > 0);
        Self {
            repr: Repr::Pooled { pointer, len, pool },
        }
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        match &self.repr {
            Repr::Empty => 0,
            Repr::Heap(data) => data.len(),
            Repr::Pooled { len, .. } => *len,
        }
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The payload bytes.
    pub fn as_slice(&self) -> &[u8] {
        match &self.repr {
            Repr::Empty => &[],
            Repr::Heap(data) => data.as_slice(),
            // SAFETY: the buffer owns `len` bytes at `pointer` until triage
            // returns them to the originating pool.
            Repr::Pooled { pointer, len, .. } => unsafe {
                std::slice::from_raw_parts(pointer.as_ptr(), *len)
            },
        }
    }

    /// The owning pool, for pooled payloads.
    pub fn pool_kind(&self) -> Option<PoolKind> {
        match &self.repr {
            Repr::Pooled { pool, .. } => Some(*pool),
            _ => None,
        }
    }

    /// The raw allocation to hand back to the owning pool.
    pub(crate) fn pooled_pointer(&self) -> Option<*mut u8> {
        match &self.repr {
            Repr::Pooled { pointer, .. } => Some(pointer.as_ptr()),
            _ => None,
        }
    }

    /// Move the payload out, leaving the empty payload behind.
    pub(crate) fn take(&mut self) -> Buffer {
        std::mem::replace(self, Buffer::empty())
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(data: Vec<u8>) -> Self {
        Self::from_vec(data)
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Repr::Empty => write!(f, "Buffer::Empty"),
            Repr::Heap(data) => write!(f, "Buffer::Heap({} bytes)", data.len()),
            Repr::Pooled { len, pool, .. } => {
                write!(f, "Buffer::Pooled({len} bytes, {pool:?})")
            }
        }
    }
}

// SAFETY: a pooled buffer owns its allocation exclusively; sending the
// buffer transfers that ownership. The originating pool is only touched
// again on its owning thread, via triage.
unsafe impl Send for Buffer {}
