//! Multi-node scenarios over the loopback transport.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

// Layer 1: Standard library imports
use std::sync::Arc;
use std::thread;

// Layer 2: Third-party crate imports
use parking_lot::Mutex;

// Layer 3: Internal module imports
use thorium::message::payload;
use thorium::prelude::*;

const SCRIPT_SENDER: ScriptId = ScriptId::new(0x2001);
const SCRIPT_RECEIVER: ScriptId = ScriptId::new(0x2002);

const TAG_SEQ: i32 = 0xA001;
const STREAM_LENGTH: i32 = 1000;

fn node_config(node_id: i32, nodes: i32, threads: usize) -> NodeConfig {
    NodeConfig::builder()
        .with_threads(threads)
        .with_identity(NodeId::new(node_id), nodes)
        .with_signal_handlers(false)
        .build()
        .expect("valid test configuration")
}

/// Pick the peer's name out of the initial-actor list carried by
/// `ACTOR_START`.
fn peer_from_start(context: &ActorContext<'_>, message: &Message) -> ActorName {
    let names = payload::unpack_i32_vec(message.payload()).expect("initial actors");
    names
        .into_iter()
        .map(ActorName::new)
        .find(|name| name.node(context.nodes()) != context.node_name())
        .expect("peer initial actor")
}

struct Sender;

impl Behavior for Sender {
    fn receive(&mut self, context: &mut ActorContext<'_>, message: &Message) {
        if message.tag() == tags::ACTOR_START {
            let receiver = peer_from_start(context, message);
            for value in 0..STREAM_LENGTH {
                context.send(receiver, TAG_SEQ, payload::pack_i32(value));
            }
        }
        // ACTOR_ASK_TO_STOP arrives from the remote receiver; the default
        // hook complies.
    }
}

struct Receiver {
    seen: Arc<Mutex<Vec<i32>>>,
    sender: Option<ActorName>,
}

impl Behavior for Receiver {
    fn receive(&mut self, context: &mut ActorContext<'_>, message: &Message) {
        match message.tag() {
            tags::ACTOR_START => {
                self.sender = Some(peer_from_start(context, message));
            }
            TAG_SEQ => {
                let value = payload::unpack_i32(message.payload()).expect("sequence value");
                let mut seen = self.seen.lock();
                seen.push(value);
                if seen.len() == STREAM_LENGTH as usize {
                    drop(seen);
                    if let Some(sender) = self.sender {
                        context.send_empty(sender, tags::ACTOR_ASK_TO_STOP);
                    }
                    context.stop();
                }
            }
            _ => {}
        }
    }
}

#[test]
fn cross_node_stream_preserves_per_pair_order() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_in = Arc::clone(&seen);

    let mut transports = LoopbackTransport::cluster(2);
    let transport1 = transports.remove(1);
    let transport0 = transports.remove(0);

    let mut node0 = Node::new(node_config(0, 2, 2), transport0).expect("node 0");
    node0
        .register_script(Script::new(SCRIPT_SENDER, "sender", || Box::new(Sender)))
        .expect("register");
    node0.spawn_initial(SCRIPT_SENDER).expect("initial");

    let mut node1 = Node::new(node_config(1, 2, 2), transport1).expect("node 1");
    node1
        .register_script(Script::new(SCRIPT_RECEIVER, "receiver", move || {
            Box::new(Receiver {
                seen: Arc::clone(&seen_in),
                sender: None,
            })
        }))
        .expect("register");
    node1.spawn_initial(SCRIPT_RECEIVER).expect("initial");

    let handle0 = thread::spawn(move || {
        node0.run().expect("node 0 run");
        node0
    });
    let handle1 = thread::spawn(move || {
        node1.run().expect("node 1 run");
        node1
    });

    let node0 = handle0.join().expect("node 0 thread");
    let node1 = handle1.join().expect("node 1 thread");

    // Per-pair FIFO survives encoding, multiplexing, and demultiplexing.
    assert_eq!(*seen.lock(), (0..STREAM_LENGTH).collect::<Vec<i32>>());

    // The stream was coalesced, not sent message-per-frame.
    let sent = node0.counters();
    assert!(sent.remote_deliveries >= STREAM_LENGTH as u64);
    assert_eq!(sent.decode_failures, 0);
    assert!(node0.multiplexed_messages() >= STREAM_LENGTH as u64);
    assert!(node0.multiplexer_frames() < STREAM_LENGTH as u64);

    // Every inbound payload buffer went home through triage.
    let usage1 = node1.memory_usage();
    assert_eq!(usage1.inbound.allocated, 0);
    assert_eq!(usage1.outbound.allocated, 0);
    assert_eq!(node0.alive_actors(), 0);
    assert_eq!(node1.alive_actors(), 0);
}

#[test]
fn empty_node_participates_and_exits() {
    // Node 1 hosts every actor; node 0 only relays the handshake.
    struct Loner;
    impl Behavior for Loner {
        fn receive(&mut self, context: &mut ActorContext<'_>, message: &Message) {
            if message.tag() == tags::ACTOR_START {
                context.stop();
            }
        }
    }

    let mut transports = LoopbackTransport::cluster(2);
    let transport1 = transports.remove(1);
    let transport0 = transports.remove(0);

    let mut node0 = Node::new(node_config(0, 2, 1), transport0).expect("node 0");
    let mut node1 = Node::new(node_config(1, 2, 1), transport1).expect("node 1");
    node1
        .register_script(Script::new(SCRIPT_RECEIVER, "loner", || Box::new(Loner)))
        .expect("register");
    node1.spawn_initial(SCRIPT_RECEIVER).expect("initial");

    let handle0 = thread::spawn(move || {
        node0.run().expect("node 0 run");
        node0
    });
    let handle1 = thread::spawn(move || {
        node1.run().expect("node 1 run");
        node1
    });

    let node0 = handle0.join().expect("node 0 thread");
    let node1 = handle1.join().expect("node 1 thread");
    assert_eq!(node0.alive_actors(), 0);
    assert_eq!(node1.counters().dead_actors, 1);
}
