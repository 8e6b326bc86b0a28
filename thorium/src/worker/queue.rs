// Layer 1: Standard library imports
use std::collections::VecDeque;
use std::time::Duration;

// Layer 2: Third-party crate imports
use parking_lot::{Condvar, Mutex};

// Layer 3: Internal module imports
use crate::actor::ActorCell;
use crate::message::Message;
use crate::util::{ActorName, WorkerId};

/// One inbound event for a worker.
///
/// Control events (actor arrival, migration, stop) ride the same FIFO as
/// message deliveries, so an actor handed to a worker is installed before
/// any message routed to it afterwards.
pub(crate) enum WorkerEvent {
    /// Deliver a message to an actor this worker owns.
    Deliver(Message),
    /// Take ownership of an actor (spawn placement or migration).
    AddActor(Box<ActorCell>),
    /// Hand the named actor to another worker.
    Migrate { name: ActorName, to: WorkerId },
    /// Quiesce and shut the worker down.
    Stop,
}

/// Multi-producer, single-consumer event FIFO with a parked wait.
///
/// Producers are other workers, the node's main thread, and the spawn
/// path; the consumer is the owning worker. Under low load the worker
/// parks here with a timeout so housekeeping still runs periodically.
pub(crate) struct InboundQueue {
    events: Mutex<VecDeque<WorkerEvent>>,
    available: Condvar,
}

impl InboundQueue {
    pub(crate) fn new() -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
        }
    }

    pub(crate) fn push(&self, event: WorkerEvent) {
        let mut events = self.events.lock();
        events.push_back(event);
        drop(events);
        self.available.notify_one();
    }

    pub(crate) fn pop(&self) -> Option<WorkerEvent> {
        self.events.lock().pop_front()
    }

    /// Take every queued event, emptying the queue.
    pub(crate) fn take_all(&self) -> VecDeque<WorkerEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub(crate) fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Park until an event arrives or `timeout` elapses.
    pub(crate) fn wait(&self, timeout: Duration) {
        let mut events = self.events.lock();
        if events.is_empty() {
            self.available.wait_for(&mut events, timeout);
        }
    }
}
