// Layer 1: Standard library imports
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use dashmap::DashMap;
use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

// Layer 3: Internal module imports
use super::counters::NodeCounters;
use super::errors::NodeError;
use crate::actor::{ActorCell, Script, ScriptTable};
use crate::message::{payload, tags, Buffer, Message};
use crate::util::{ActorName, NodeId, ScriptId, WorkerId};
use crate::worker::{WorkerEvent, WorkerShared};

/// Registry entry for one live actor.
struct ActorRecord {
    name: ActorName,
    script: ScriptId,
}

/// The actors table, name→index map, and dead-index queue.
///
/// All three are guarded together by the spawn/death lock, exactly the
/// structures the lock is named for. Indices are recycled; names are not.
struct ActorRegistry {
    actors: Vec<Option<ActorRecord>>,
    indices: HashMap<i32, usize>,
    dead_indices: VecDeque<usize>,
    name_counter: i32,
}

impl ActorRegistry {
    fn new() -> Self {
        Self {
            actors: Vec::new(),
            indices: HashMap::new(),
            dead_indices: VecDeque::new(),
            name_counter: 0,
        }
    }
}

/// Node state reachable from worker threads.
///
/// Guards, per the concurrency design: the spawn/death lock (`registry`),
/// the script lock (`scripts`), and the auto-scaling lock
/// (`auto_scaling`). The name→worker map is a concurrent map so routing
/// never takes the spawn/death lock.
pub(crate) struct NodeShared {
    node_id: NodeId,
    nodes: i32,
    deterministic_names: bool,
    pub(crate) workers: Vec<Arc<WorkerShared>>,
    /// Actor name -> owning worker, for every local live actor.
    locations: DashMap<i32, WorkerId>,
    registry: Mutex<ActorRegistry>,
    scripts: Mutex<ScriptTable>,
    auto_scaling: Mutex<HashSet<i32>>,
    /// Messages bound for other nodes, drained by the main loop.
    remote_outbound: Mutex<VecDeque<Message>>,
    /// Pooled buffers of dropped messages, reclaimed by the main loop.
    unroutable: Mutex<Vec<Buffer>>,
    name_rng: Mutex<SmallRng>,
    pub(crate) counters: NodeCounters,
    alive_actors: AtomicI64,
    round_robin: AtomicUsize,
    shutdown_requested: AtomicBool,
}

impl NodeShared {
    pub(crate) fn new(
        node_id: NodeId,
        nodes: i32,
        deterministic_names: bool,
        workers: Vec<Arc<WorkerShared>>,
    ) -> Self {
        Self {
            node_id,
            nodes,
            deterministic_names,
            workers,
            locations: DashMap::new(),
            registry: Mutex::new(ActorRegistry::new()),
            scripts: Mutex::new(ScriptTable::new()),
            auto_scaling: Mutex::new(HashSet::new()),
            remote_outbound: Mutex::new(VecDeque::new()),
            unroutable: Mutex::new(Vec::new()),
            name_rng: Mutex::new(SmallRng::from_entropy()),
            counters: NodeCounters::default(),
            alive_actors: AtomicI64::new(0),
            round_robin: AtomicUsize::new(0),
            shutdown_requested: AtomicBool::new(false),
        }
    }

    pub(crate) fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub(crate) fn nodes(&self) -> i32 {
        self.nodes
    }

    pub(crate) fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub(crate) fn alive_actors(&self) -> i64 {
        self.alive_actors.load(Ordering::Acquire)
    }

    pub(crate) fn request_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::Release);
    }

    pub(crate) fn shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::Acquire)
    }

    // -- scripts ----------------------------------------------------------

    pub(crate) fn register_script(&self, script: Script) -> Result<(), NodeError> {
        self.scripts.lock().register(script)?;
        Ok(())
    }

    pub(crate) fn find_script(&self, id: ScriptId) -> Option<Script> {
        self.scripts.lock().find(id).cloned()
    }

    // -- spawn and death --------------------------------------------------

    /// Spawn an actor of `script_id`, supervised by `supervisor`.
    ///
    /// Allocates an index (reusing a dead one when available), generates a
    /// cluster-unique name, places the actor on a worker, and hands the
    /// cell over. The name is addressable before this returns.
    pub(crate) fn spawn(
        &self,
        script_id: ScriptId,
        supervisor: ActorName,
    ) -> Result<ActorName, NodeError> {
        let script = self
            .find_script(script_id)
            .ok_or(NodeError::UnknownScript(script_id))?;
        let state = script.instantiate();

        let worker = self.place();
        let name;
        {
            let mut registry = self.registry.lock();
            let index = match registry.dead_indices.pop_front() {
                Some(reused) => reused,
                None => {
                    registry.actors.push(None);
                    registry.actors.len() - 1
                }
            };
            name = self.generate_name(&mut registry);
            registry.actors[index] = Some(ActorRecord {
                name,
                script: script_id,
            });
            registry.indices.insert(name.value(), index);
        }
        self.locations.insert(name.value(), worker);
        self.workers[worker.value()].actor_added();
        self.alive_actors.fetch_add(1, Ordering::AcqRel);
        self.counters.record_spawn();

        let cell = ActorCell::new(name, script_id, supervisor, state);
        self.workers[worker.value()]
            .queue
            .push(WorkerEvent::AddActor(Box::new(cell)));
        debug!(actor = %name, script = %script_id, worker = %worker, "spawned actor");
        Ok(name)
    }

    /// Release a dead actor's index and name registration.
    ///
    /// The owning worker has already run the destroy hook and dropped the
    /// cell; calling this twice for one actor is a no-op.
    pub(crate) fn notify_death(&self, name: ActorName) {
        {
            let mut registry = self.registry.lock();
            let Some(index) = registry.indices.remove(&name.value()) else {
                return;
            };
            registry.actors[index] = None;
            registry.dead_indices.push_back(index);
        }
        self.locations.remove(&name.value());
        self.alive_actors.fetch_sub(1, Ordering::AcqRel);
        self.counters.record_death();
        debug!(actor = %name, "actor died");
    }

    /// Round-robin placement biased toward the least-loaded worker.
    fn place(&self) -> WorkerId {
        let count = self.workers.len();
        let start = self.round_robin.fetch_add(1, Ordering::Relaxed) % count;
        let mut best = start;
        let mut best_load = usize::MAX;
        for offset in 0..count {
            let candidate = (start + offset) % count;
            let load = self.workers[candidate].actor_count();
            if load < best_load {
                best = candidate;
                best_load = load;
            }
        }
        WorkerId::new(best)
    }

    /// Generate a cluster-unique name congruent to this node.
    ///
    /// Deterministic mode walks `node + counter * nodes`; random mode
    /// draws from the reserved range above the node identifiers, snapped
    /// to the same congruence class and filtered against live names.
    fn generate_name(&self, registry: &mut ActorRegistry) -> ActorName {
        if self.deterministic_names {
            registry.name_counter += 1;
            return ActorName::new(self.node_id.value() + registry.name_counter * self.nodes);
        }
        let mut rng = self.name_rng.lock();
        loop {
            let draw = rng.gen_range(self.nodes..i32::MAX);
            let mut value = draw - (draw - self.node_id.value()).rem_euclid(self.nodes);
            if value < self.nodes {
                value += self.nodes;
            }
            if !registry.indices.contains_key(&value) {
                return ActorName::new(value);
            }
        }
    }

    // -- routing ----------------------------------------------------------

    /// Route `message` toward its destination: a local worker queue, the
    /// node's own service handler, or the remote-outbound queue.
    pub(crate) fn route(&self, mut message: Message) {
        let destination = message.destination();
        if destination.node(self.nodes) != self.node_id {
            self.counters.record_remote_delivery();
            self.remote_outbound.lock().push_back(message);
            return;
        }

        if tags::is_node_serviced_tag(message.tag()) {
            self.service(message);
            return;
        }

        // The location guard is held across the queue push so a migration
        // hand-off cannot slip between lookup and delivery.
        if let Some(worker) = self.locations.get(&destination.value()) {
            message.set_routing_worker(*worker);
            self.workers[(*worker).value()]
                .queue
                .push(WorkerEvent::Deliver(message));
            self.counters.record_local_delivery();
        } else {
            self.counters.record_dropped_unroutable();
            warn!(destination = %destination, tag = message.tag(), "dropping message for unknown actor");
            self.triage_buffer(message.take_buffer());
        }
    }

    /// Answer tags the node services on behalf of actors.
    fn service(&self, mut message: Message) {
        let tag = message.tag();
        let reply_source = message.destination();
        let reply_destination = message.source();
        match tag {
            tags::ACTOR_SPAWN => {
                let spawned = payload::unpack_i32(message.payload())
                    .map(ScriptId::new)
                    .and_then(|script| self.spawn(script, message.source()).ok());
                let name = match spawned {
                    Some(name) => name,
                    None => {
                        self.counters.record_spawn_failure();
                        warn!(source = %message.source(), "spawn request failed");
                        ActorName::NOBODY
                    }
                };
                self.triage_buffer(message.take_buffer());
                self.route(Message::new(
                    tags::ACTOR_SPAWN_REPLY,
                    reply_source,
                    reply_destination,
                    payload::pack_i32(name.value()),
                ));
            }
            tags::ACTOR_GET_NODE_WORKER_COUNT => {
                self.triage_buffer(message.take_buffer());
                self.route(Message::new(
                    tags::ACTOR_GET_NODE_WORKER_COUNT_REPLY,
                    reply_source,
                    reply_destination,
                    payload::pack_i32(self.worker_count() as i32),
                ));
            }
            _ => {
                self.triage_buffer(message.take_buffer());
            }
        }
    }

    /// Ask the current owner of `name` to hand it to worker `to`.
    pub(crate) fn migrate(&self, name: ActorName, to: WorkerId) -> Result<(), NodeError> {
        if to.value() >= self.workers.len() {
            return Err(NodeError::Configuration(format!(
                "migration target {to} out of range"
            )));
        }
        let Some(current) = self.lookup_worker(name) else {
            return Err(NodeError::UnknownActor(name));
        };
        if current == to {
            return Ok(());
        }
        self.workers[current.value()]
            .queue
            .push(WorkerEvent::Migrate { name, to });
        Ok(())
    }

    /// Flip the routing entry for a migrating actor while its old worker
    /// holds the hand-off. Returns false if the actor died meanwhile.
    ///
    /// The caller runs inside the location entry's critical section for
    /// the whole hand-off; see the worker's migration path.
    pub(crate) fn locations_entry(
        &self,
        name: ActorName,
    ) -> dashmap::mapref::entry::Entry<'_, i32, WorkerId> {
        self.locations.entry(name.value())
    }

    pub(crate) fn lookup_worker(&self, name: ActorName) -> Option<WorkerId> {
        self.locations.get(&name.value()).map(|worker| *worker)
    }

    pub(crate) fn has_actor(&self, name: ActorName) -> bool {
        self.locations.contains_key(&name.value())
    }

    pub(crate) fn lookup_script(&self, name: ActorName) -> Option<ScriptId> {
        let registry = self.registry.lock();
        let index = *registry.indices.get(&name.value())?;
        let record = registry.actors.get(index)?.as_ref()?;
        if record.name != name {
            return None;
        }
        Some(record.script)
    }

    /// Every local live actor name.
    pub(crate) fn live_names(&self) -> Vec<ActorName> {
        self.locations
            .iter()
            .map(|entry| ActorName::new(*entry.key()))
            .collect()
    }

    /// (dead index count, table capacity) under the spawn/death lock.
    pub(crate) fn registry_stats(&self) -> (usize, usize) {
        let registry = self.registry.lock();
        (registry.dead_indices.len(), registry.actors.len())
    }

    // -- cross-thread reclamation -----------------------------------------

    /// Hand a payload buffer to the main thread for reclamation. Heap and
    /// empty buffers are dropped in place.
    pub(crate) fn triage_buffer(&self, buffer: Buffer) {
        if buffer.pool_kind().is_some() {
            self.unroutable.lock().push(buffer);
        }
    }

    pub(crate) fn drain_unroutable(&self) -> Vec<Buffer> {
        std::mem::take(&mut *self.unroutable.lock())
    }

    pub(crate) fn drain_remote_outbound(&self, max: usize) -> Vec<Message> {
        let mut queue = self.remote_outbound.lock();
        let take = max.min(queue.len());
        queue.drain(..take).collect()
    }

    pub(crate) fn remote_outbound_len(&self) -> usize {
        self.remote_outbound.lock().len()
    }

    // -- auto-scaling -----------------------------------------------------

    pub(crate) fn set_auto_scaling(&self, name: ActorName, enabled: bool) {
        let mut set = self.auto_scaling.lock();
        if enabled {
            set.insert(name.value());
        } else {
            set.remove(&name.value());
        }
    }

    pub(crate) fn auto_scaling_count(&self) -> usize {
        self.auto_scaling.lock().len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::actor::{ActorContext, Behavior};

    struct Nop;
    impl Behavior for Nop {
        fn receive(&mut self, _context: &mut ActorContext<'_>, _message: &Message) {}
    }

    fn shared(workers: usize) -> NodeShared {
        let workers = (0..workers)
            .map(|id| Arc::new(WorkerShared::new(WorkerId::new(id))))
            .collect();
        let shared = NodeShared::new(NodeId::new(0), 1, true, workers);
        shared
            .register_script(Script::new(ScriptId::new(1), "nop", || Box::new(Nop)))
            .unwrap();
        shared
    }

    #[test]
    fn test_spawn_registers_name_and_places_cell() {
        let shared = shared(2);
        let name = shared.spawn(ScriptId::new(1), ActorName::NOBODY).unwrap();

        assert!(shared.has_actor(name));
        assert_eq!(shared.alive_actors(), 1);
        assert_eq!(shared.lookup_script(name), Some(ScriptId::new(1)));
        let worker = shared.lookup_worker(name).unwrap();
        assert_eq!(shared.workers[worker.value()].queue.len(), 1);
    }

    #[test]
    fn test_spawn_unknown_script_is_error() {
        let shared = shared(1);
        let result = shared.spawn(ScriptId::new(99), ActorName::NOBODY);
        assert!(matches!(result, Err(NodeError::UnknownScript(_))));
        assert_eq!(shared.alive_actors(), 0);
    }

    #[test]
    fn test_deterministic_names_walk_the_congruence_class() {
        let workers = vec![Arc::new(WorkerShared::new(WorkerId::new(0)))];
        let shared = NodeShared::new(NodeId::new(2), 4, true, workers);
        shared
            .register_script(Script::new(ScriptId::new(1), "nop", || Box::new(Nop)))
            .unwrap();

        let a = shared.spawn(ScriptId::new(1), ActorName::NOBODY).unwrap();
        let b = shared.spawn(ScriptId::new(1), ActorName::NOBODY).unwrap();
        assert_eq!(a, ActorName::new(6));
        assert_eq!(b, ActorName::new(10));
        assert_eq!(a.node(4), NodeId::new(2));
        assert_eq!(b.node(4), NodeId::new(2));
    }

    #[test]
    fn test_random_names_stay_in_reserved_congruence_class() {
        let workers = vec![Arc::new(WorkerShared::new(WorkerId::new(0)))];
        let shared = NodeShared::new(NodeId::new(1), 3, false, workers);
        shared
            .register_script(Script::new(ScriptId::new(1), "nop", || Box::new(Nop)))
            .unwrap();

        for _ in 0..50 {
            let name = shared.spawn(ScriptId::new(1), ActorName::NOBODY).unwrap();
            assert!(name.value() >= 3);
            assert_eq!(name.node(3), NodeId::new(1));
        }
    }

    #[test]
    fn test_death_recycles_index_but_not_name() {
        let shared = shared(1);
        let first = shared.spawn(ScriptId::new(1), ActorName::NOBODY).unwrap();
        shared.notify_death(first);
        assert!(!shared.has_actor(first));
        assert_eq!(shared.alive_actors(), 0);
        let (dead, capacity) = shared.registry_stats();
        assert_eq!((dead, capacity), (1, 1));

        let second = shared.spawn(ScriptId::new(1), ActorName::NOBODY).unwrap();
        assert_ne!(second, first);
        // The head dead index was reused: the table did not grow.
        let (dead, capacity) = shared.registry_stats();
        assert_eq!((dead, capacity), (0, 1));
    }

    #[test]
    fn test_notify_death_twice_is_noop() {
        let shared = shared(1);
        let name = shared.spawn(ScriptId::new(1), ActorName::NOBODY).unwrap();
        shared.notify_death(name);
        shared.notify_death(name);
        assert_eq!(shared.alive_actors(), 0);
        assert_eq!(shared.counters.snapshot().dead_actors, 1);
    }

    #[test]
    fn test_placement_prefers_less_loaded_worker() {
        let shared = shared(2);
        let first = shared.spawn(ScriptId::new(1), ActorName::NOBODY).unwrap();
        let second = shared.spawn(ScriptId::new(1), ActorName::NOBODY).unwrap();
        let workers: HashSet<WorkerId> = [first, second]
            .iter()
            .filter_map(|name| shared.lookup_worker(*name))
            .collect();
        assert_eq!(workers.len(), 2);
    }

    #[test]
    fn test_route_to_unknown_actor_drops_with_counter() {
        let shared = shared(1);
        shared.route(Message::with_empty_payload(
            77,
            ActorName::new(1),
            ActorName::new(999),
        ));
        assert_eq!(shared.counters.snapshot().dropped_unroutable, 1);
    }

    #[test]
    fn test_route_remote_destination_queues_for_transport() {
        let workers = vec![Arc::new(WorkerShared::new(WorkerId::new(0)))];
        let shared = NodeShared::new(NodeId::new(0), 2, true, workers);
        // Name 3 is congruent to node 1.
        shared.route(Message::with_empty_payload(
            5,
            ActorName::new(2),
            ActorName::new(3),
        ));
        assert_eq!(shared.remote_outbound_len(), 1);
        assert_eq!(shared.counters.snapshot().remote_deliveries, 1);
    }

    #[test]
    fn test_spawn_service_replies_with_name() {
        let shared = shared(1);
        let requester = shared.spawn(ScriptId::new(1), ActorName::NOBODY).unwrap();
        // Drain the AddActor event so the queue only holds the reply.
        let _ = shared.workers[0].queue.take_all();

        shared.route(Message::new(
            tags::ACTOR_SPAWN,
            requester,
            requester,
            payload::pack_i32(1),
        ));

        assert_eq!(shared.alive_actors(), 2);
        // Queue now holds the new cell and the reply, in that order.
        let events = shared.workers[0].queue.take_all();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], WorkerEvent::AddActor(_)));
        match &events[1] {
            WorkerEvent::Deliver(reply) => {
                assert_eq!(reply.tag(), tags::ACTOR_SPAWN_REPLY);
                assert_eq!(reply.destination(), requester);
                let name = payload::unpack_i32(reply.payload()).unwrap();
                assert!(shared.has_actor(ActorName::new(name)));
            }
            _ => panic!("expected a spawn reply"),
        }
    }

    #[test]
    fn test_spawn_service_unknown_script_replies_nobody() {
        let shared = shared(1);
        let requester = shared.spawn(ScriptId::new(1), ActorName::NOBODY).unwrap();
        let _ = shared.workers[0].queue.take_all();

        shared.route(Message::new(
            tags::ACTOR_SPAWN,
            requester,
            requester,
            payload::pack_i32(42),
        ));

        let events = shared.workers[0].queue.take_all();
        match &events[0] {
            WorkerEvent::Deliver(reply) => {
                assert_eq!(
                    payload::unpack_i32(reply.payload()),
                    Some(ActorName::NOBODY.value())
                );
            }
            _ => panic!("expected a spawn reply"),
        }
        assert_eq!(shared.counters.snapshot().spawn_failures, 1);
    }

    #[test]
    fn test_worker_count_service() {
        let shared = shared(2);
        let requester = shared.spawn(ScriptId::new(1), ActorName::NOBODY).unwrap();
        let worker = shared.lookup_worker(requester).unwrap();
        let _ = shared.workers[worker.value()].queue.take_all();

        shared.route(Message::with_empty_payload(
            tags::ACTOR_GET_NODE_WORKER_COUNT,
            requester,
            requester,
        ));

        let events = shared.workers[worker.value()].queue.take_all();
        match &events[0] {
            WorkerEvent::Deliver(reply) => {
                assert_eq!(reply.tag(), tags::ACTOR_GET_NODE_WORKER_COUNT_REPLY);
                assert_eq!(payload::unpack_i32(reply.payload()), Some(2));
            }
            _ => panic!("expected a worker count reply"),
        }
    }

    #[test]
    fn test_auto_scaling_set_tracks_membership() {
        let shared = shared(1);
        let name = ActorName::new(5);
        shared.set_auto_scaling(name, true);
        assert_eq!(shared.auto_scaling_count(), 1);
        shared.set_auto_scaling(name, false);
        assert_eq!(shared.auto_scaling_count(), 0);
    }
}
