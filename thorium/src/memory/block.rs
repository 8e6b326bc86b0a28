// Layer 1: Standard library imports
use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::ptr::NonNull;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
// (none)

/// Alignment of the backing region of every block.
pub(crate) const BLOCK_ALIGNMENT: usize = std::mem::align_of::<usize>();

/// A contiguous bump-allocation region.
///
/// Sub-allocations are handed out in order until the block is exhausted;
/// `reset` rewinds the bump pointer without releasing the region to the
/// operating system. The pool moves exhausted blocks to its dried list and
/// recycles them through `reset`.
pub struct MemoryBlock {
    data: NonNull<u8>,
    capacity: usize,
    offset: usize,
}

impl MemoryBlock {
    /// Allocate a block of `capacity` bytes from the system allocator.
    ///
    /// Allocation failure is fatal, per the pool's resource-exhaustion
    /// contract.
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0);
        // Layout construction cannot fail: capacity is non-zero and the
        // alignment is a power of two.
        let layout = Layout::from_size_align(capacity, BLOCK_ALIGNMENT)
            .unwrap_or_else(|_| handle_alloc_error(Layout::new::<u8>()));
        // SAFETY: layout has non-zero size.
        let raw = unsafe { alloc(layout) };
        let Some(data) = NonNull::new(raw) else {
            handle_alloc_error(layout);
        };
        Self {
            data,
            capacity,
            offset: 0,
        }
    }

    /// Bump-allocate `size` bytes, or `None` if the block lacks room.
    pub fn allocate(&mut self, size: usize) -> Option<NonNull<u8>> {
        if size == 0 || self.offset + size > self.capacity {
            return None;
        }
        // SAFETY: offset + size <= capacity, so the result stays inside
        // the allocated region.
        let pointer = unsafe { self.data.as_ptr().add(self.offset) };
        self.offset += size;
        NonNull::new(pointer)
    }

    /// Rewind the bump pointer. Previously returned pointers are invalid
    /// after this.
    pub fn reset(&mut self) {
        self.offset = 0;
    }

    /// Bytes handed out since the last reset.
    pub fn used(&self) -> usize {
        self.offset
    }

    /// Total capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Drop for MemoryBlock {
    fn drop(&mut self) {
        // Layout mirrors the one used in new().
        if let Ok(layout) = Layout::from_size_align(self.capacity, BLOCK_ALIGNMENT) {
            // SAFETY: data was allocated with exactly this layout.
            unsafe { dealloc(self.data.as_ptr(), layout) };
        }
    }
}

// SAFETY: the block exclusively owns its region; moving it between threads
// moves ownership of the region with it.
unsafe impl Send for MemoryBlock {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocations_are_sequential() {
        let mut block = MemoryBlock::new(64);
        let a = block.allocate(16).map(|p| p.as_ptr() as usize);
        let b = block.allocate(16).map(|p| p.as_ptr() as usize);
        assert!(a.is_some() && b.is_some());
        assert_eq!(b, a.map(|addr| addr + 16));
        assert_eq!(block.used(), 32);
    }

    #[test]
    fn test_exhaustion_returns_none() {
        let mut block = MemoryBlock::new(32);
        assert!(block.allocate(32).is_some());
        assert!(block.allocate(1).is_none());
    }

    #[test]
    fn test_reset_rewinds() {
        let mut block = MemoryBlock::new(32);
        let first = block.allocate(32).map(|p| p.as_ptr() as usize);
        block.reset();
        assert_eq!(block.used(), 0);
        let again = block.allocate(32).map(|p| p.as_ptr() as usize);
        assert_eq!(first, again);
    }

    #[test]
    fn test_zero_size_is_rejected() {
        let mut block = MemoryBlock::new(32);
        assert!(block.allocate(0).is_none());
    }
}
