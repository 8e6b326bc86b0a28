// Layer 1: Standard library imports
use std::collections::VecDeque;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::script::Behavior;
use crate::message::Message;
use crate::util::{ActorName, ScriptId};

/// One live actor: identity, concrete state, and mailbox.
///
/// A cell belongs to exactly one worker between spawn and death; its state
/// is mutated only during a receive step on that worker, so the cell
/// carries no synchronization of its own.
pub struct ActorCell {
    name: ActorName,
    script: ScriptId,
    supervisor: ActorName,
    state: Box<dyn Behavior>,
    mailbox: VecDeque<Message>,
    dead: bool,
    started: bool,
    scheduled: bool,
    received_count: u64,
}

impl ActorCell {
    /// Assemble a cell around freshly constructed script state.
    pub(crate) fn new(
        name: ActorName,
        script: ScriptId,
        supervisor: ActorName,
        state: Box<dyn Behavior>,
    ) -> Self {
        Self {
            name,
            script,
            supervisor,
            state,
            mailbox: VecDeque::new(),
            dead: false,
            started: false,
            scheduled: false,
            received_count: 0,
        }
    }

    /// The cluster-unique actor name.
    pub fn name(&self) -> ActorName {
        self.name
    }

    /// The script this actor runs.
    pub fn script(&self) -> ScriptId {
        self.script
    }

    /// The supervising actor (the spawner).
    pub fn supervisor(&self) -> ActorName {
        self.supervisor
    }

    /// Messages consumed so far.
    pub fn received_count(&self) -> u64 {
        self.received_count
    }

    pub(crate) fn state_mut(&mut self) -> &mut dyn Behavior {
        &mut *self.state
    }

    pub(crate) fn enqueue(&mut self, message: Message) {
        self.mailbox.push_back(message);
    }

    pub(crate) fn dequeue(&mut self) -> Option<Message> {
        self.mailbox.pop_front()
    }

    pub(crate) fn mailbox_is_empty(&self) -> bool {
        self.mailbox.is_empty()
    }

    pub(crate) fn mailbox_len(&self) -> usize {
        self.mailbox.len()
    }

    pub(crate) fn is_scheduled(&self) -> bool {
        self.scheduled
    }

    pub(crate) fn set_scheduled(&mut self, scheduled: bool) {
        self.scheduled = scheduled;
    }

    pub(crate) fn is_started(&self) -> bool {
        self.started
    }

    pub(crate) fn mark_started(&mut self) {
        self.started = true;
    }

    pub(crate) fn is_dead(&self) -> bool {
        self.dead
    }

    pub(crate) fn mark_dead(&mut self) {
        self.dead = true;
    }

    pub(crate) fn record_received(&mut self) {
        self.received_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::ActorContext;

    struct Nop;
    impl Behavior for Nop {
        fn receive(&mut self, _context: &mut ActorContext<'_>, _message: &Message) {}
    }

    fn cell() -> ActorCell {
        ActorCell::new(
            ActorName::new(5),
            ScriptId::new(1),
            ActorName::new(3),
            Box::new(Nop),
        )
    }

    #[test]
    fn test_mailbox_is_fifo() {
        let mut cell = cell();
        cell.enqueue(Message::with_empty_payload(1, ActorName::new(0), ActorName::new(5)));
        cell.enqueue(Message::with_empty_payload(2, ActorName::new(0), ActorName::new(5)));
        assert_eq!(cell.mailbox_len(), 2);
        assert_eq!(cell.dequeue().map(|m| m.tag()), Some(1));
        assert_eq!(cell.dequeue().map(|m| m.tag()), Some(2));
        assert!(cell.mailbox_is_empty());
    }

    #[test]
    fn test_flags_default_clear() {
        let cell = cell();
        assert!(!cell.is_dead());
        assert!(!cell.is_started());
        assert!(!cell.is_scheduled());
        assert_eq!(cell.received_count(), 0);
        assert_eq!(cell.supervisor(), ActorName::new(3));
    }
}
