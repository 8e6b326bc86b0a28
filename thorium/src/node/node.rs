// Layer 1: Standard library imports
use std::collections::BTreeMap;
use std::ptr::NonNull;
use std::sync::Arc;
use std::time::{Duration, Instant};

// Layer 2: Third-party crate imports
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

// Layer 3: Internal module imports
use super::config::{NodeConfig, LOAD_REPORT_PERIOD_SECS};
use super::counters::CountersSnapshot;
use super::errors::NodeError;
use super::shared::NodeShared;
use super::signals;
use crate::actor::Script;
use crate::memory::MemoryPool;
use crate::message::multiplexer::{self, MessageMultiplexer};
use crate::message::{payload, tags, Buffer, Message, MessageHeader, PoolKind};
use crate::transport::Transport;
use crate::util::{ActorName, NodeId, ScriptId, WorkerId};
use crate::worker::WorkerPool;

/// Frames accepted from the transport per loop iteration.
const TRANSPORT_POLL_LIMIT: usize = 64;

/// Remote-bound messages drained from workers per loop iteration.
const OUTBOUND_DRAIN_LIMIT: usize = 128;

/// Main-loop sleep when an iteration made no progress.
const IDLE_SLEEP: Duration = Duration::from_micros(200);

/// Live usage of one memory pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolUsage {
    /// Slabs currently owned by the pool.
    pub blocks: usize,
    /// Live tracked small allocations.
    pub allocated: usize,
    /// Bytes held by live tracked small allocations.
    pub allocated_bytes: usize,
    /// Live large-block allocations.
    pub large_blocks: usize,
}

impl PoolUsage {
    fn of(pool: &MemoryPool) -> Self {
        Self {
            blocks: pool.block_count(),
            allocated: pool.allocated_count(),
            allocated_bytes: pool.allocated_bytes(),
            large_blocks: pool.large_block_count(),
        }
    }
}

/// Usage of the node-level message pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryUsageReport {
    /// The transport receive-path pool.
    pub inbound: PoolUsage,
    /// The pool for main-thread synthesized messages.
    pub outbound: PoolUsage,
}

/// A Thorium node: the per-process root of the actor engine.
///
/// Owns the actors table, the worker pool, the registered scripts, the
/// transport and multiplexer, and the inbound/outbound message pools. The
/// thread calling [`Node::run`] becomes the main/transport thread: it polls
/// the transport, pushes received messages into workers, drains outbound
/// messages to the transport, and reclaims triaged buffers.
///
/// # Example
/// ```rust,no_run
/// use thorium::actor::Script;
/// use thorium::node::{Node, NodeConfig};
/// use thorium::transport::LoopbackTransport;
/// use thorium::util::ScriptId;
///
/// # fn behavior() -> Box<dyn thorium::actor::Behavior> { unimplemented!() }
/// let config = NodeConfig::builder().with_threads(4).build().unwrap();
/// let mut node = Node::new(config, LoopbackTransport::single()).unwrap();
/// node.register_script(Script::new(ScriptId::new(1), "main", behavior)).unwrap();
/// node.spawn_initial(ScriptId::new(1)).unwrap();
/// node.run().unwrap();
/// ```
pub struct Node {
    config: NodeConfig,
    shared: Arc<NodeShared>,
    worker_pool: WorkerPool,
    transport: Box<dyn Transport>,
    multiplexer: MessageMultiplexer,
    inbound_pool: MemoryPool,
    outbound_pool: MemoryPool,
    /// Initial actor names per node, in node order.
    initial_actors: BTreeMap<i32, Vec<i32>>,
    own_initial: Vec<ActorName>,
    received_batches: usize,
    reply_acks: usize,
    start_sent: bool,
    start_pending: bool,
    started: bool,
    stop_broadcast_sent: bool,
    start_time: DateTime<Utc>,
    last_load_report: Instant,
    last_processed: Vec<u64>,
}

impl Node {
    /// Assemble a node from its configuration and transport endpoint.
    pub fn new(config: NodeConfig, transport: impl Transport + 'static) -> Result<Self, NodeError> {
        config.validate().map_err(NodeError::Configuration)?;
        if transport.node_id() != config.node_id {
            return Err(NodeError::IdentityMismatch {
                configured: config.node_id,
                transport: transport.node_id(),
            });
        }
        if transport.node_count() != config.nodes {
            return Err(NodeError::Configuration(format!(
                "configured for {} nodes but transport connects {}",
                config.nodes,
                transport.node_count()
            )));
        }

        let worker_pool = WorkerPool::prepare(config.threads);
        let shared = Arc::new(NodeShared::new(
            config.node_id,
            config.nodes,
            config.deterministic_names,
            worker_pool.shared_handles(),
        ));
        let threads = config.threads;
        let node = Self {
            inbound_pool: MemoryPool::new(config.inbound_block_size),
            outbound_pool: MemoryPool::new(config.outbound_block_size),
            multiplexer: MessageMultiplexer::new(
                config.multiplexer_threshold,
                config.multiplexer_frame_capacity,
            ),
            worker_pool,
            shared,
            transport: Box::new(transport),
            initial_actors: BTreeMap::new(),
            own_initial: Vec::new(),
            received_batches: 0,
            reply_acks: 0,
            start_sent: false,
            start_pending: false,
            started: false,
            stop_broadcast_sent: false,
            start_time: Utc::now(),
            last_load_report: Instant::now(),
            last_processed: vec![0; threads],
            config,
        };
        Ok(node)
    }

    /// This node's identity.
    pub fn node_id(&self) -> NodeId {
        self.config.node_id
    }

    /// Number of nodes in the cluster.
    pub fn nodes(&self) -> i32 {
        self.config.nodes
    }

    /// Number of workers on this node.
    pub fn worker_count(&self) -> usize {
        self.worker_pool.worker_count()
    }

    /// The active configuration.
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Register a script; must precede any spawn of it.
    pub fn register_script(&self, script: Script) -> Result<(), NodeError> {
        self.shared.register_script(script)
    }

    /// Spawn an unsupervised actor of `script`.
    pub fn spawn(&self, script: ScriptId) -> Result<ActorName, NodeError> {
        self.shared.spawn(script, ActorName::NOBODY)
    }

    /// Spawn an actor and mark it initial: it receives `ACTOR_START` with
    /// the names of every initial actor once the cluster is assembled.
    pub fn spawn_initial(&mut self, script: ScriptId) -> Result<ActorName, NodeError> {
        let name = self.shared.spawn(script, ActorName::NOBODY)?;
        self.own_initial.push(name);
        self.initial_actors
            .entry(self.config.node_id.value())
            .or_default()
            .push(name.value());
        Ok(name)
    }

    /// Route a message toward its destination actor.
    pub fn send(&self, message: Message) {
        self.shared.route(message);
    }

    /// Move an actor (with its mailbox) to another worker on this node.
    pub fn migrate(&self, name: ActorName, to: WorkerId) -> Result<(), NodeError> {
        self.shared.migrate(name, to)
    }

    /// Request a cooperative shutdown, as a shutdown signal would.
    pub fn request_shutdown(&self) {
        self.shared.request_shutdown();
    }

    /// Live actors on this node.
    pub fn alive_actors(&self) -> i64 {
        self.shared.alive_actors()
    }

    /// Whether `name` is a live local actor.
    pub fn has_actor(&self, name: ActorName) -> bool {
        self.shared.has_actor(name)
    }

    /// The worker owning `name`, if local and alive.
    pub fn lookup_worker(&self, name: ActorName) -> Option<WorkerId> {
        self.shared.lookup_worker(name)
    }

    /// The script a live local actor runs.
    pub fn lookup_script(&self, name: ActorName) -> Option<ScriptId> {
        self.shared.lookup_script(name)
    }

    /// Event counters snapshot.
    pub fn counters(&self) -> CountersSnapshot {
        self.shared.counters.snapshot()
    }

    /// (dead index count, actors table capacity).
    pub fn registry_stats(&self) -> (usize, usize) {
        self.shared.registry_stats()
    }

    /// Wire frames the multiplexer has emitted.
    pub fn multiplexer_frames(&self) -> u64 {
        self.multiplexer.frames_flushed()
    }

    /// Messages that rode a coalesced frame.
    pub fn multiplexed_messages(&self) -> u64 {
        self.multiplexer.messages_multiplexed()
    }

    /// Usage of the node-level message pools.
    pub fn memory_usage(&self) -> MemoryUsageReport {
        MemoryUsageReport {
            inbound: PoolUsage::of(&self.inbound_pool),
            outbound: PoolUsage::of(&self.outbound_pool),
        }
    }

    /// Run the node to completion.
    ///
    /// Starts the workers, assembles the cluster's initial actors, then
    /// drives the main loop until every local actor has died. Workers are
    /// then stopped in two phases and outstanding buffers reclaimed.
    pub fn run(&mut self) -> Result<(), NodeError> {
        if self.config.install_signal_handlers {
            signals::install();
        }
        info!(
            node = %self.config.node_id,
            nodes = self.config.nodes,
            workers = self.config.threads,
            started_at = %self.start_time,
            "node starting"
        );
        self.worker_pool
            .start(&self.shared, self.config.ephemeral_block_size)?;

        if self.config.nodes == 1 {
            self.handle_node_start();
        } else {
            let names = payload::pack_i32_vec(
                &self
                    .own_initial
                    .iter()
                    .map(|name| name.value())
                    .collect::<Vec<i32>>(),
            );
            for peer in 0..self.config.nodes {
                if peer != self.config.node_id.value() {
                    self.send_node_message(peer, tags::NODE_ADD_INITIAL_ACTORS, names.clone());
                }
            }
        }

        let result = self.run_loop();

        self.worker_pool.shutdown();
        self.reclaim_buffers();
        self.discard_remote_backlog();

        if self.config.print_counters {
            info!(counters = ?self.counters(), "node counters");
        }
        if self.config.print_memory_usage {
            info!(memory = ?self.memory_usage(), "node memory usage");
        }
        info!(node = %self.config.node_id, "node stopped");
        result
    }

    /// The main/transport loop.
    fn run_loop(&mut self) -> Result<(), NodeError> {
        let mut ready_frames: Vec<(NodeId, Bytes)> = Vec::new();
        loop {
            let mut progress = false;

            for _ in 0..TRANSPORT_POLL_LIMIT {
                let Some((from, frame)) = self.transport.poll() else {
                    break;
                };
                progress = true;
                self.dispatch_frame(from, frame);
            }

            let outbound = self.shared.drain_remote_outbound(OUTBOUND_DRAIN_LIMIT);
            if !outbound.is_empty() {
                progress = true;
            }
            for mut message in outbound {
                let destination_node = message.destination().node(self.config.nodes);
                self.multiplexer
                    .push(destination_node, &message, &mut ready_frames);
                let buffer = message.take_buffer();
                self.reclaim_buffer(buffer);
            }
            self.multiplexer.flush_all(&mut ready_frames);
            for (destination, frame) in ready_frames.drain(..) {
                self.transport.send(destination, frame)?;
            }

            if self.reclaim_buffers() {
                progress = true;
            }

            if (signals::shutdown_requested() || self.shared.shutdown_requested())
                && !self.stop_broadcast_sent
            {
                self.broadcast_stop();
            }

            self.maybe_report_load();

            if self.started
                && self.shared.alive_actors() == 0
                && self.shared.remote_outbound_len() == 0
                && !self.multiplexer.has_pending()
            {
                return Ok(());
            }

            if !progress {
                std::thread::sleep(IDLE_SLEEP);
            }
        }
    }

    /// Decode one received frame and dispatch its messages.
    fn dispatch_frame(&mut self, from: NodeId, frame: Bytes) {
        let messages = match multiplexer::demultiplex(&frame) {
            Ok(messages) => messages,
            Err(error) => {
                self.shared.counters.record_decode_failure();
                warn!(%error, %from, "dropping undecodable frame");
                return;
            }
        };
        // Collect before touching pools: the decoded slices borrow the
        // frame, and node-level handling may synthesize new messages.
        let mut deliveries: Vec<(MessageHeader, Vec<u8>)> = Vec::new();
        let mut node_level: Vec<(MessageHeader, Vec<u8>)> = Vec::new();
        for (header, body) in messages {
            if tags::is_node_tag(header.tag) {
                node_level.push((header, body.to_vec()));
            } else {
                deliveries.push((header, body.to_vec()));
            }
        }
        for (header, body) in node_level {
            self.handle_node_message(from, header, &body);
        }
        for (header, body) in deliveries {
            let buffer = self.charge_inbound(&body);
            self.shared
                .route(Message::new(header.tag, header.source, header.destination, buffer));
        }
    }

    /// Node-level tags, consumed here rather than delivered to actors.
    fn handle_node_message(&mut self, from: NodeId, header: MessageHeader, body: &[u8]) {
        match header.tag {
            tags::NODE_ADD_INITIAL_ACTOR => match payload::unpack_i32(body) {
                Some(name) => {
                    self.initial_actors
                        .entry(from.value())
                        .or_default()
                        .push(name);
                }
                None => self.shared.counters.record_decode_failure(),
            },
            tags::NODE_ADD_INITIAL_ACTORS => match payload::unpack_i32_vec(body) {
                Some(names) => {
                    debug!(%from, count = names.len(), "received initial actors");
                    self.initial_actors.insert(from.value(), names);
                    self.received_batches += 1;
                    self.send_node_message(
                        from.value(),
                        tags::NODE_ADD_INITIAL_ACTORS_REPLY,
                        Vec::new(),
                    );
                    if self.start_pending && self.received_batches == (self.config.nodes - 1) as usize
                    {
                        self.handle_node_start();
                    }
                    self.maybe_start_cluster();
                }
                None => self.shared.counters.record_decode_failure(),
            },
            tags::NODE_ADD_INITIAL_ACTORS_REPLY => {
                self.reply_acks += 1;
                self.maybe_start_cluster();
            }
            tags::NODE_START => self.handle_node_start(),
            _ => {}
        }
    }

    /// Node 0 releases the cluster once every peer has announced and
    /// acknowledged.
    fn maybe_start_cluster(&mut self) {
        let peers = (self.config.nodes - 1) as usize;
        if self.config.node_id.value() != 0
            || self.start_sent
            || self.received_batches < peers
            || self.reply_acks < peers
        {
            return;
        }
        self.start_sent = true;
        for peer in 1..self.config.nodes {
            self.send_node_message(peer, tags::NODE_START, Vec::new());
        }
        self.handle_node_start();
    }

    /// Begin this node's initial actors.
    fn handle_node_start(&mut self) {
        if self.started {
            return;
        }
        let peers = (self.config.nodes - 1) as usize;
        if self.config.nodes > 1 && self.received_batches < peers {
            // A peer's announcement is still in flight; start once it
            // lands.
            self.start_pending = true;
            return;
        }
        self.started = true;
        let all: Vec<i32> = self
            .initial_actors
            .values()
            .flat_map(|names| names.iter().copied())
            .collect();
        let start_payload = payload::pack_i32_vec(&all);
        for name in self.own_initial.clone() {
            let buffer = self.charge_outbound(&start_payload);
            self.shared
                .route(Message::new(tags::ACTOR_START, name, name, buffer));
        }
        info!(node = %self.config.node_id, initial_actors = all.len(), "node started");
    }

    /// Ask every live local actor to stop.
    fn broadcast_stop(&mut self) {
        self.stop_broadcast_sent = true;
        let names = self.shared.live_names();
        info!(actors = names.len(), "broadcasting stop request");
        for name in names {
            self.shared
                .route(Message::with_empty_payload(tags::ACTOR_ASK_TO_STOP, name, name));
        }
    }

    fn send_node_message(&mut self, peer: i32, tag: i32, body: Vec<u8>) {
        self.shared.route(Message::new(
            tag,
            ActorName::new(self.config.node_id.value()),
            ActorName::new(peer),
            body,
        ));
    }

    /// Copy a received payload into the inbound pool.
    fn charge_inbound(&mut self, body: &[u8]) -> Buffer {
        Self::charge(&mut self.inbound_pool, PoolKind::Inbound, body)
    }

    /// Copy a synthesized payload into the outbound pool.
    fn charge_outbound(&mut self, body: &[u8]) -> Buffer {
        Self::charge(&mut self.outbound_pool, PoolKind::Outbound, body)
    }

    fn charge(pool: &mut MemoryPool, kind: PoolKind, body: &[u8]) -> Buffer {
        if body.is_empty() {
            return Buffer::empty();
        }
        let raw = pool.allocate(body.len());
        let Some(pointer) = NonNull::new(raw) else {
            // allocate only returns null for a zero-size request.
            return Buffer::empty();
        };
        // SAFETY: the pool handed out len writable bytes at pointer.
        unsafe {
            std::ptr::copy_nonoverlapping(body.as_ptr(), pointer.as_ptr(), body.len());
        }
        Buffer::pooled(pointer, body.len(), kind)
    }

    /// Drain every triage queue, returning buffers to their pools.
    fn reclaim_buffers(&mut self) -> bool {
        let mut buffers: Vec<Buffer> = Vec::new();
        for worker in self.shared.workers.iter() {
            buffers.extend(worker.take_triage());
        }
        buffers.extend(self.shared.drain_unroutable());
        let any = !buffers.is_empty();
        for buffer in buffers {
            self.reclaim_buffer(buffer);
        }
        any
    }

    fn reclaim_buffer(&mut self, buffer: Buffer) {
        match buffer.pool_kind() {
            Some(PoolKind::Inbound) => {
                if let Some(pointer) = buffer.pooled_pointer() {
                    self.inbound_pool.free(pointer);
                }
            }
            Some(PoolKind::Outbound) => {
                if let Some(pointer) = buffer.pooled_pointer() {
                    self.outbound_pool.free(pointer);
                }
            }
            None => {}
        }
    }

    /// Free buffers of messages that will never leave (post-shutdown).
    fn discard_remote_backlog(&mut self) {
        loop {
            let backlog = self.shared.drain_remote_outbound(OUTBOUND_DRAIN_LIMIT);
            if backlog.is_empty() {
                break;
            }
            for mut message in backlog {
                let buffer = message.take_buffer();
                self.reclaim_buffer(buffer);
            }
        }
    }

    fn maybe_report_load(&mut self) {
        if !self.config.print_load {
            return;
        }
        let elapsed = self.last_load_report.elapsed();
        if elapsed < Duration::from_secs(LOAD_REPORT_PERIOD_SECS) {
            return;
        }
        for (index, worker) in self.shared.workers.iter().enumerate() {
            let processed = worker.processed();
            let delta = processed - self.last_processed[index];
            self.last_processed[index] = processed;
            info!(
                worker = index,
                messages = delta,
                rate = delta as f64 / elapsed.as_secs_f64(),
                actors = worker.actor_count(),
                "worker load"
            );
        }
        info!(
            alive_actors = self.shared.alive_actors(),
            auto_scaling = self.shared.auto_scaling_count(),
            "node load"
        );
        self.last_load_report = Instant::now();
    }
}
