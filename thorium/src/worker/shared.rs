// Layer 1: Standard library imports
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

// Layer 2: Third-party crate imports
use parking_lot::Mutex;

// Layer 3: Internal module imports
use super::queue::InboundQueue;
use crate::message::Buffer;
use crate::util::WorkerId;

/// The cross-thread face of one worker.
///
/// The node's router pushes events into `queue`; placement reads
/// `actor_count`; the load reporter reads `processed`; the node's main
/// loop drains `triage`: pooled payload buffers whose ownership crossed
/// back from this worker to the pool-owning thread.
pub(crate) struct WorkerShared {
    id: WorkerId,
    pub(crate) queue: InboundQueue,
    actor_count: AtomicUsize,
    processed: AtomicU64,
    triage: Mutex<Vec<Buffer>>,
}

impl WorkerShared {
    pub(crate) fn new(id: WorkerId) -> Self {
        Self {
            id,
            queue: InboundQueue::new(),
            actor_count: AtomicUsize::new(0),
            processed: AtomicU64::new(0),
            triage: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn id(&self) -> WorkerId {
        self.id
    }

    pub(crate) fn actor_count(&self) -> usize {
        self.actor_count.load(Ordering::Relaxed)
    }

    pub(crate) fn actor_added(&self) {
        self.actor_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn actor_removed(&self) {
        self.actor_count.fetch_sub(1, Ordering::Relaxed);
    }

    /// Cumulative receive steps driven by this worker.
    pub(crate) fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub(crate) fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Queue a pooled buffer for reclamation on the pool-owning thread.
    pub(crate) fn inject_buffer(&self, buffer: Buffer) {
        self.triage.lock().push(buffer);
    }

    /// Take every buffer awaiting reclamation.
    pub(crate) fn take_triage(&self) -> Vec<Buffer> {
        std::mem::take(&mut *self.triage.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_count_tracking() {
        let shared = WorkerShared::new(WorkerId::new(0));
        shared.actor_added();
        shared.actor_added();
        shared.actor_removed();
        assert_eq!(shared.actor_count(), 1);
    }

    #[test]
    fn test_triage_hand_off() {
        let shared = WorkerShared::new(WorkerId::new(1));
        shared.inject_buffer(Buffer::from_vec(vec![1, 2]));
        shared.inject_buffer(Buffer::empty());
        assert_eq!(shared.take_triage().len(), 2);
        assert!(shared.take_triage().is_empty());
    }
}
