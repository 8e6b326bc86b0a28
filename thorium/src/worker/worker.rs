// Layer 1: Standard library imports
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use tracing::warn;

// Layer 3: Internal module imports
use super::queue::WorkerEvent;
use super::shared::WorkerShared;
use crate::actor::{ActorCell, ActorContext};
use crate::memory::MemoryPool;
use crate::message::{tags, Buffer, Message};
use crate::node::shared::NodeShared;
use crate::util::{ActorName, WorkerId};

/// Outbound messages handed to the router per loop iteration.
const OUTBOUND_DRAIN_LIMIT: usize = 64;

/// Inbound events serviced per loop iteration.
const INBOUND_SERVICE_LIMIT: usize = 64;

/// Parked-wait bound so housekeeping still runs under low load.
const PARK_TIMEOUT: Duration = Duration::from_millis(20);

/// A worker: one thread driving the receive steps of the actors it owns.
///
/// The loop is cooperative. Each iteration drains a bounded number of
/// outbound messages to the router, runs at most one receive step, then
/// services a bounded number of inbound events. Within a worker, receive
/// steps are serialized; across workers they run in parallel.
pub(crate) struct Worker {
    id: WorkerId,
    shared: Arc<WorkerShared>,
    node: Arc<NodeShared>,
    actors: HashMap<i32, ActorCell>,
    /// Actors with a non-empty mailbox, each queued at most once.
    ready: VecDeque<ActorName>,
    outbound: VecDeque<Message>,
    /// Reusable staging area for sends made during a receive step.
    staged: Vec<Message>,
    /// Events put back during a migration hand-off.
    replay: VecDeque<WorkerEvent>,
    ephemeral: MemoryPool,
    stopping: bool,
}

impl Worker {
    pub(crate) fn new(
        id: WorkerId,
        shared: Arc<WorkerShared>,
        node: Arc<NodeShared>,
        ephemeral_block_size: usize,
    ) -> Self {
        let mut ephemeral = MemoryPool::new(ephemeral_block_size);
        ephemeral.disable_tracking();
        Self {
            id,
            shared,
            node,
            actors: HashMap::new(),
            ready: VecDeque::new(),
            outbound: VecDeque::new(),
            staged: Vec::new(),
            replay: VecDeque::new(),
            ephemeral,
            stopping: false,
        }
    }

    /// The cooperative worker loop. Returns after a stop event once all
    /// local work has drained; remaining actors are destroyed on the way
    /// out.
    pub(crate) fn run(mut self) {
        loop {
            let mut progress = false;
            if self.flush_outbound() {
                progress = true;
            }
            if self.run_receive_step() {
                progress = true;
            }
            if self.service_inbound() {
                progress = true;
            }
            if self.stopping && self.is_quiescent() {
                break;
            }
            if !progress {
                self.shared.queue.wait(PARK_TIMEOUT);
            }
        }
        self.drain_on_shutdown();
    }

    fn is_quiescent(&self) -> bool {
        self.ready.is_empty()
            && self.outbound.is_empty()
            && self.replay.is_empty()
            && self.shared.queue.len() == 0
    }

    /// Step 1: hand staged outbound messages to the node's router.
    fn flush_outbound(&mut self) -> bool {
        let mut progress = false;
        for _ in 0..OUTBOUND_DRAIN_LIMIT {
            let Some(message) = self.outbound.pop_front() else {
                break;
            };
            self.node.route(message);
            progress = true;
        }
        progress
    }

    /// Step 2: run one receive step for the next ready actor.
    fn run_receive_step(&mut self) -> bool {
        let Some(name) = self.ready.pop_front() else {
            return false;
        };

        let mut message = {
            // Stale entries (death or migration won the race) still count
            // as progress so the loop does not park over a non-empty queue.
            let Some(cell) = self.actors.get_mut(&name.value()) else {
                return true;
            };
            cell.set_scheduled(false);
            let Some(message) = cell.dequeue() else {
                return true;
            };
            message
        };

        // The terminal stop never reaches the behavior.
        if message.tag() == tags::ACTOR_STOP {
            let buffer = message.take_buffer();
            self.triage_buffer(buffer);
            self.destroy_actor(name);
            return true;
        }

        let mut staged = std::mem::take(&mut self.staged);
        if let Some(cell) = self.actors.get_mut(&name.value()) {
            let mut context = ActorContext::new(
                name,
                cell.supervisor(),
                message.source(),
                message.tag(),
                self.id,
                &self.node,
                &mut staged,
                &mut self.ephemeral,
            );
            if message.tag() == tags::ACTOR_ASK_TO_STOP {
                cell.state_mut().on_ask_to_stop(&mut context);
            } else {
                cell.state_mut().receive(&mut context, &message);
            }
            cell.record_received();
            if !cell.mailbox_is_empty() && !cell.is_scheduled() {
                cell.set_scheduled(true);
                self.ready.push_back(name);
            }
        }
        for staged_message in staged.drain(..) {
            self.outbound.push_back(staged_message);
        }
        self.staged = staged;

        self.shared.record_processed();
        let buffer = message.take_buffer();
        self.triage_buffer(buffer);
        self.ephemeral.free_all();
        true
    }

    /// Step 3: service inbound events, migration replays first.
    fn service_inbound(&mut self) -> bool {
        let mut progress = false;
        for _ in 0..INBOUND_SERVICE_LIMIT {
            let event = match self.replay.pop_front() {
                Some(event) => event,
                None => match self.shared.queue.pop() {
                    Some(event) => event,
                    None => break,
                },
            };
            progress = true;
            match event {
                WorkerEvent::Deliver(message) => self.enqueue_message(message),
                WorkerEvent::AddActor(cell) => self.install_actor(cell),
                WorkerEvent::Migrate { name, to } => self.handle_migrate(name, to),
                WorkerEvent::Stop => self.stopping = true,
            }
        }
        progress
    }

    fn enqueue_message(&mut self, mut message: Message) {
        match self.actors.get_mut(&message.destination().value()) {
            Some(cell) => {
                cell.enqueue(message);
                if !cell.is_scheduled() {
                    cell.set_scheduled(true);
                    let name = cell.name();
                    self.ready.push_back(name);
                }
            }
            None => {
                // Lost the race with this actor's death.
                self.node.counters.record_dropped_unroutable();
                warn!(
                    destination = %message.destination(),
                    tag = message.tag(),
                    "worker dropping message for departed actor"
                );
                let buffer = message.take_buffer();
                self.triage_buffer(buffer);
            }
        }
    }

    fn install_actor(&mut self, cell: Box<ActorCell>) {
        let mut cell = *cell;
        let name = cell.name();
        if !cell.is_started() {
            let mut staged = std::mem::take(&mut self.staged);
            {
                let mut context = ActorContext::new(
                    name,
                    cell.supervisor(),
                    name,
                    0,
                    self.id,
                    &self.node,
                    &mut staged,
                    &mut self.ephemeral,
                );
                cell.state_mut().on_start(&mut context);
            }
            cell.mark_started();
            for staged_message in staged.drain(..) {
                self.outbound.push_back(staged_message);
            }
            self.staged = staged;
        }
        cell.set_scheduled(!cell.mailbox_is_empty());
        if cell.is_scheduled() {
            self.ready.push_back(name);
        }
        self.actors.insert(name.value(), cell);
    }

    /// Hand `name` to worker `to`.
    ///
    /// The routing flip, the cell hand-off, and the forwarding of
    /// already-queued deliveries all happen inside the location entry's
    /// critical section, so per-(source, destination) order survives the
    /// move.
    fn handle_migrate(&mut self, name: ActorName, to: WorkerId) {
        if to == self.id || to.value() >= self.node.workers.len() {
            return;
        }
        let Some(mut cell) = self.actors.remove(&name.value()) else {
            return;
        };
        cell.set_scheduled(false);
        let target = Arc::clone(&self.node.workers[to.value()]);

        use dashmap::mapref::entry::Entry;
        match self.node.locations_entry(name) {
            Entry::Occupied(mut entry) => {
                entry.insert(to);
                target.queue.push(WorkerEvent::AddActor(Box::new(cell)));
                for event in self.shared.queue.take_all() {
                    match event {
                        WorkerEvent::Deliver(message) if message.destination() == name => {
                            target.queue.push(WorkerEvent::Deliver(message));
                        }
                        other => self.replay.push_back(other),
                    }
                }
                self.shared.actor_removed();
                target.actor_added();
            }
            Entry::Vacant(_) => {
                // No routing entry; the actor stays put.
                self.actors.insert(name.value(), cell);
            }
        }
    }

    /// Death path: destroy hook, mailbox triage, index release.
    fn destroy_actor(&mut self, name: ActorName) {
        let Some(mut cell) = self.actors.remove(&name.value()) else {
            return;
        };
        cell.mark_dead();
        let mut staged = std::mem::take(&mut self.staged);
        {
            let mut context = ActorContext::new(
                name,
                cell.supervisor(),
                name,
                tags::ACTOR_STOP,
                self.id,
                &self.node,
                &mut staged,
                &mut self.ephemeral,
            );
            cell.state_mut().on_stop(&mut context);
        }
        for staged_message in staged.drain(..) {
            self.outbound.push_back(staged_message);
        }
        self.staged = staged;

        while let Some(mut message) = cell.dequeue() {
            let buffer = message.take_buffer();
            self.triage_buffer(buffer);
        }
        self.shared.actor_removed();
        self.node.notify_death(name);
        self.ephemeral.free_all();
    }

    /// Return a pooled payload to its owning pool via this worker's
    /// injection queue; heap payloads just drop.
    fn triage_buffer(&self, buffer: Buffer) {
        if buffer.pool_kind().is_some() {
            self.shared.inject_buffer(buffer);
        }
    }

    /// Shutdown epilogue: consume leftover events, destroy remaining
    /// actors, and flush their farewell traffic.
    fn drain_on_shutdown(&mut self) {
        let leftovers: Vec<WorkerEvent> = self
            .replay
            .drain(..)
            .chain(self.shared.queue.take_all())
            .collect();
        for event in leftovers {
            match event {
                WorkerEvent::Deliver(mut message) => {
                    let buffer = message.take_buffer();
                    self.triage_buffer(buffer);
                }
                WorkerEvent::AddActor(cell) => self.install_actor(cell),
                _ => {}
            }
        }
        let names: Vec<ActorName> = self.actors.values().map(ActorCell::name).collect();
        for name in names {
            self.destroy_actor(name);
        }
        while let Some(message) = self.outbound.pop_front() {
            self.node.route(message);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::actor::{Behavior, Script};
    use crate::util::{NodeId, ScriptId};
    use std::sync::atomic::{AtomicU64, Ordering};

    const TAG_TICK: i32 = 0x6001;

    struct Counting {
        ticks: Arc<AtomicU64>,
        stops: Arc<AtomicU64>,
    }

    impl Behavior for Counting {
        fn receive(&mut self, _context: &mut ActorContext<'_>, message: &Message) {
            if message.tag() == TAG_TICK {
                self.ticks.fetch_add(1, Ordering::SeqCst);
            }
        }

        fn on_stop(&mut self, _context: &mut ActorContext<'_>) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Harness {
        node: Arc<NodeShared>,
        workers: Vec<Worker>,
        ticks: Arc<AtomicU64>,
        stops: Arc<AtomicU64>,
    }

    fn harness(worker_count: usize) -> Harness {
        let shared: Vec<Arc<WorkerShared>> = (0..worker_count)
            .map(|id| Arc::new(WorkerShared::new(WorkerId::new(id))))
            .collect();
        let node = Arc::new(NodeShared::new(NodeId::new(0), 1, true, shared.clone()));

        let ticks = Arc::new(AtomicU64::new(0));
        let stops = Arc::new(AtomicU64::new(0));
        let (ticks_in, stops_in) = (Arc::clone(&ticks), Arc::clone(&stops));
        node.register_script(Script::new(ScriptId::new(1), "counting", move || {
            Box::new(Counting {
                ticks: Arc::clone(&ticks_in),
                stops: Arc::clone(&stops_in),
            })
        }))
        .unwrap();

        let workers = shared
            .iter()
            .map(|ws| Worker::new(ws.id(), Arc::clone(ws), Arc::clone(&node), 4096))
            .collect();
        Harness {
            node,
            workers,
            ticks,
            stops,
        }
    }

    /// Drive every worker's loop body once, single-threaded.
    fn pump(harness: &mut Harness, iterations: usize) {
        for _ in 0..iterations {
            for worker in harness.workers.iter_mut() {
                worker.flush_outbound();
                worker.run_receive_step();
                worker.service_inbound();
            }
        }
    }

    #[test]
    fn test_deliver_and_receive() {
        let mut harness = harness(1);
        let name = harness
            .node
            .spawn(ScriptId::new(1), ActorName::NOBODY)
            .unwrap();
        harness
            .node
            .route(Message::with_empty_payload(TAG_TICK, name, name));

        pump(&mut harness, 3);
        assert_eq!(harness.ticks.load(Ordering::SeqCst), 1);
        assert_eq!(harness.workers[0].actors.len(), 1);
    }

    #[test]
    fn test_stop_tag_runs_death_path() {
        let mut harness = harness(1);
        let name = harness
            .node
            .spawn(ScriptId::new(1), ActorName::NOBODY)
            .unwrap();
        harness
            .node
            .route(Message::with_empty_payload(tags::ACTOR_STOP, name, name));

        pump(&mut harness, 3);
        assert_eq!(harness.stops.load(Ordering::SeqCst), 1);
        assert_eq!(harness.node.alive_actors(), 0);
        assert!(harness.workers[0].actors.is_empty());
        assert_eq!(harness.node.workers[0].actor_count(), 0);
    }

    #[test]
    fn test_ask_to_stop_defaults_to_compliance() {
        let mut harness = harness(1);
        let name = harness
            .node
            .spawn(ScriptId::new(1), ActorName::NOBODY)
            .unwrap();
        harness
            .node
            .route(Message::with_empty_payload(tags::ACTOR_ASK_TO_STOP, name, name));

        // ask -> staged self stop -> routed -> delivered -> death
        pump(&mut harness, 5);
        assert_eq!(harness.stops.load(Ordering::SeqCst), 1);
        assert_eq!(harness.node.alive_actors(), 0);
    }

    #[test]
    fn test_mailbox_fifo_within_one_actor() {
        let mut harness = harness(1);
        let name = harness
            .node
            .spawn(ScriptId::new(1), ActorName::NOBODY)
            .unwrap();
        for _ in 0..10 {
            harness
                .node
                .route(Message::with_empty_payload(TAG_TICK, name, name));
        }
        pump(&mut harness, 15);
        assert_eq!(harness.ticks.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_migration_moves_cell_and_preserves_pending() {
        let mut harness = harness(2);
        let name = harness
            .node
            .spawn(ScriptId::new(1), ActorName::NOBODY)
            .unwrap();
        let origin = harness.node.lookup_worker(name).unwrap();
        pump(&mut harness, 2);

        // Queue messages at the current owner, then ask for a move before
        // they are serviced.
        for _ in 0..4 {
            harness
                .node
                .route(Message::with_empty_payload(TAG_TICK, name, name));
        }
        let target = WorkerId::new(1 - origin.value());
        harness.node.migrate(name, target).unwrap();

        pump(&mut harness, 10);
        assert_eq!(harness.node.lookup_worker(name), Some(target));
        assert_eq!(harness.ticks.load(Ordering::SeqCst), 4);
        assert_eq!(harness.workers[target.value()].actors.len(), 1);
        assert!(harness.workers[origin.value()].actors.is_empty());
        assert_eq!(harness.node.workers[target.value()].actor_count(), 1);
        assert_eq!(harness.node.workers[origin.value()].actor_count(), 0);
    }

    #[test]
    fn test_drain_on_shutdown_destroys_actors() {
        let mut harness = harness(1);
        let _name = harness
            .node
            .spawn(ScriptId::new(1), ActorName::NOBODY)
            .unwrap();
        pump(&mut harness, 2);

        let mut worker = harness.workers.remove(0);
        worker.drain_on_shutdown();
        assert_eq!(harness.stops.load(Ordering::SeqCst), 1);
        assert_eq!(harness.node.alive_actors(), 0);
    }
}
