// Layer 1: Standard library imports
use std::sync::Arc;
use std::thread::JoinHandle;

// Layer 2: Third-party crate imports
use tracing::debug;

// Layer 3: Internal module imports
use super::queue::WorkerEvent;
use super::shared::WorkerShared;
use super::worker::Worker;
use crate::node::errors::NodeError;
use crate::node::shared::NodeShared;
use crate::util::WorkerId;

/// Owns the node's N workers and their thread lifecycle.
///
/// The pool's cross-thread facets (spawn placement, message routing, and
/// migration requests) operate on the worker handles through the node's
/// shared state, callable from any thread. The pool itself handles the two
/// thread-lifecycle phases: `start` and the two-phase `shutdown` (quiesce,
/// then join).
pub struct WorkerPool {
    shared: Vec<Arc<WorkerShared>>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Prepare handles for `count` workers without starting threads yet;
    /// the handles seed the node's shared state first.
    pub(crate) fn prepare(count: usize) -> Self {
        let shared = (0..count)
            .map(|id| Arc::new(WorkerShared::new(WorkerId::new(id))))
            .collect();
        Self {
            shared,
            handles: Vec::new(),
        }
    }

    /// The cross-thread worker handles, in worker-id order.
    pub(crate) fn shared_handles(&self) -> Vec<Arc<WorkerShared>> {
        self.shared.clone()
    }

    pub(crate) fn worker_count(&self) -> usize {
        self.shared.len()
    }

    /// Start one OS thread per worker.
    pub(crate) fn start(
        &mut self,
        node: &Arc<NodeShared>,
        ephemeral_block_size: usize,
    ) -> Result<(), NodeError> {
        debug_assert!(self.handles.is_empty());
        for worker_shared in &self.shared {
            let worker = Worker::new(
                worker_shared.id(),
                Arc::clone(worker_shared),
                Arc::clone(node),
                ephemeral_block_size,
            );
            let handle = std::thread::Builder::new()
                .name(format!("thorium-worker-{}", worker_shared.id().value()))
                .spawn(move || worker.run())?;
            self.handles.push(handle);
        }
        debug!(workers = self.shared.len(), "worker pool started");
        Ok(())
    }

    /// Stop all workers: quiesce each with a stop event, then join the
    /// threads.
    pub(crate) fn shutdown(&mut self) {
        for worker_shared in &self.shared {
            worker_shared.queue.push(WorkerEvent::Stop);
        }
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
        debug!("worker pool stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::NodeId;

    #[test]
    fn test_prepare_numbers_workers_in_order() {
        let pool = WorkerPool::prepare(3);
        let ids: Vec<usize> = pool
            .shared_handles()
            .iter()
            .map(|shared| shared.id().value())
            .collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(pool.worker_count(), 3);
    }

    #[test]
    fn test_start_and_shutdown_round_trip() {
        let mut pool = WorkerPool::prepare(2);
        let node = Arc::new(NodeShared::new(
            NodeId::new(0),
            1,
            true,
            pool.shared_handles(),
        ));
        assert!(pool.start(&node, 4096).is_ok());
        pool.shutdown();
        assert!(pool.handles.is_empty());
    }
}
