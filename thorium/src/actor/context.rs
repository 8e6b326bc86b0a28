// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use crate::memory::MemoryPool;
use crate::message::{tags, Buffer, Message};
use crate::node::errors::NodeError;
use crate::node::shared::NodeShared;
use crate::util::{ActorName, NodeId, ScriptId, WorkerId};

/// The actor's view of the engine during one receive step.
///
/// Borrowed for the duration of the step on the owning worker thread.
/// Outbound sends are staged here and handed to the node's router when the
/// step returns, so a receive callback never blocks on routing.
///
/// # Example
/// ```rust,ignore
/// fn receive(&mut self, context: &mut ActorContext<'_>, message: &Message) {
///     match message.tag() {
///         PING => context.reply(PONG, Vec::new()),
///         _ => {}
///     }
/// }
/// ```
pub struct ActorContext<'a> {
    name: ActorName,
    supervisor: ActorName,
    source: ActorName,
    tag: i32,
    worker: WorkerId,
    node: &'a NodeShared,
    staged: &'a mut Vec<Message>,
    ephemeral: &'a mut MemoryPool,
}

impl<'a> ActorContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        name: ActorName,
        supervisor: ActorName,
        source: ActorName,
        tag: i32,
        worker: WorkerId,
        node: &'a NodeShared,
        staged: &'a mut Vec<Message>,
        ephemeral: &'a mut MemoryPool,
    ) -> Self {
        Self {
            name,
            supervisor,
            source,
            tag,
            worker,
            node,
            staged,
            ephemeral,
        }
    }

    /// This actor's name.
    pub fn name(&self) -> ActorName {
        self.name
    }

    /// The actor that spawned this one.
    pub fn supervisor(&self) -> ActorName {
        self.supervisor
    }

    /// Source of the message being processed.
    pub fn source(&self) -> ActorName {
        self.source
    }

    /// Tag of the message being processed.
    pub fn tag(&self) -> i32 {
        self.tag
    }

    /// The worker driving this step.
    pub fn worker(&self) -> WorkerId {
        self.worker
    }

    /// This node's identity.
    pub fn node_name(&self) -> NodeId {
        self.node.node_id()
    }

    /// Number of nodes in the cluster.
    pub fn nodes(&self) -> i32 {
        self.node.nodes()
    }

    /// Number of workers on this node.
    pub fn worker_count(&self) -> usize {
        self.node.worker_count()
    }

    /// Stage a message to `destination`; the payload buffer's ownership
    /// transfers to the engine.
    pub fn send(&mut self, destination: ActorName, tag: i32, payload: impl Into<Buffer>) {
        self.staged
            .push(Message::new(tag, self.name, destination, payload));
    }

    /// Stage a payload-free message to `destination`.
    pub fn send_empty(&mut self, destination: ActorName, tag: i32) {
        self.send(destination, tag, Buffer::empty());
    }

    /// Stage a reply to the current message's source.
    pub fn reply(&mut self, tag: i32, payload: impl Into<Buffer>) {
        let destination = self.source;
        self.send(destination, tag, payload);
    }

    /// Stage a payload-free reply.
    pub fn reply_empty(&mut self, tag: i32) {
        let destination = self.source;
        self.send_empty(destination, tag);
    }

    /// Send the terminal stop to self. The owning worker intercepts it and
    /// runs the death path; pending mailbox traffic ahead of it is still
    /// delivered.
    pub fn stop(&mut self) {
        let name = self.name;
        self.send_empty(name, tags::ACTOR_STOP);
    }

    /// Spawn an actor of `script` on this node, supervised by this actor.
    ///
    /// The returned name is addressable immediately: any message staged
    /// after this call is delivered after the new actor is installed.
    pub fn spawn(&mut self, script: ScriptId) -> Result<ActorName, NodeError> {
        self.node.spawn(script, self.name)
    }

    /// Request an explicit rebalance: hand `name` (with its mailbox) to
    /// worker `to` on this node. Ownership transfers via a control
    /// message; per-(source, destination) delivery order is preserved.
    pub fn migrate(&mut self, name: ActorName, to: WorkerId) -> Result<(), NodeError> {
        self.node.migrate(name, to)
    }

    /// Scratch allocations that live until the end of this receive step.
    ///
    /// The pool is wiped wholesale after the step; individual frees are
    /// no-ops.
    pub fn ephemeral(&mut self) -> &mut MemoryPool {
        self.ephemeral
    }

    /// Enter or leave the node's auto-scaling set.
    pub fn set_auto_scaling(&mut self, enabled: bool) {
        self.node.set_auto_scaling(self.name, enabled);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::actor::{Behavior, Script};
    use crate::node::shared::NodeShared;
    use crate::worker::WorkerShared;
    use std::sync::Arc;

    struct Nop;
    impl Behavior for Nop {
        fn receive(&mut self, _context: &mut ActorContext<'_>, _message: &Message) {}
    }

    fn harness() -> (Arc<NodeShared>, Vec<Message>, MemoryPool) {
        let workers = vec![Arc::new(WorkerShared::new(WorkerId::new(0)))];
        let shared = Arc::new(NodeShared::new(NodeId::new(0), 1, true, workers));
        shared
            .register_script(Script::new(ScriptId::new(1), "nop", || Box::new(Nop)))
            .unwrap();
        (shared, Vec::new(), MemoryPool::new(4096))
    }

    #[test]
    fn test_sends_are_staged_in_order() {
        let (shared, mut staged, mut ephemeral) = harness();
        let mut context = ActorContext::new(
            ActorName::new(1),
            ActorName::NOBODY,
            ActorName::new(2),
            9,
            WorkerId::new(0),
            &shared,
            &mut staged,
            &mut ephemeral,
        );

        context.send(ActorName::new(5), 10, vec![1]);
        context.reply_empty(11);
        context.stop();

        assert_eq!(staged.len(), 3);
        assert_eq!(staged[0].destination(), ActorName::new(5));
        assert_eq!(staged[0].source(), ActorName::new(1));
        assert_eq!(staged[1].destination(), ActorName::new(2));
        assert_eq!(staged[2].tag(), tags::ACTOR_STOP);
        assert_eq!(staged[2].destination(), ActorName::new(1));
    }

    #[test]
    fn test_spawn_supervises_with_own_name() {
        let (shared, mut staged, mut ephemeral) = harness();
        let mut context = ActorContext::new(
            ActorName::new(1),
            ActorName::NOBODY,
            ActorName::new(1),
            0,
            WorkerId::new(0),
            &shared,
            &mut staged,
            &mut ephemeral,
        );

        let child = context.spawn(ScriptId::new(1)).unwrap();
        assert!(shared.has_actor(child));
        assert!(context.spawn(ScriptId::new(7)).is_err());
    }

    #[test]
    fn test_ephemeral_scratch_is_usable() {
        let (shared, mut staged, mut ephemeral) = harness();
        let mut context = ActorContext::new(
            ActorName::new(1),
            ActorName::NOBODY,
            ActorName::new(1),
            0,
            WorkerId::new(0),
            &shared,
            &mut staged,
            &mut ephemeral,
        );

        let scratch = context.ephemeral().allocate(64);
        assert!(!scratch.is_null());
    }
}
