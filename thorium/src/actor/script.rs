// Layer 1: Standard library imports
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use super::context::ActorContext;
use crate::message::Message;
use crate::util::ScriptId;

/// Behavior shared by every actor of one script.
///
/// The concrete actor state lives in the implementing type; the engine
/// owns it through a `Box<dyn Behavior>` inside the actor cell and only
/// touches it from the owning worker during a receive step. Receive
/// callbacks are cooperative: they must not block the worker thread for
/// unbounded time and may not suspend.
pub trait Behavior: Send {
    /// Process one message. Unknown tags should be ignored (the engine
    /// counts drops at routing boundaries; scripts decide locally).
    fn receive(&mut self, context: &mut ActorContext<'_>, message: &Message);

    /// Called once on the owning worker before the first message.
    fn on_start(&mut self, _context: &mut ActorContext<'_>) {}

    /// Called when a termination request arrives. The default complies
    /// immediately by sending the terminal stop to self; override to run
    /// teardown message traffic first.
    fn on_ask_to_stop(&mut self, context: &mut ActorContext<'_>) {
        context.stop();
    }

    /// Called on the owning worker when the actor dies.
    fn on_stop(&mut self, _context: &mut ActorContext<'_>) {}
}

type Constructor = Arc<dyn Fn() -> Box<dyn Behavior> + Send + Sync>;

/// Immutable behavior descriptor: identifier, human name, and state
/// constructor.
///
/// Scripts are values registered with the node before any actor of that
/// script is spawned, not types the engine is generic over.
///
/// # Example
/// ```rust
/// use thorium::actor::{Behavior, Script};
/// use thorium::util::ScriptId;
///
/// struct Echo;
/// impl Behavior for Echo {
///     fn receive(
///         &mut self,
///         context: &mut thorium::actor::ActorContext<'_>,
///         message: &thorium::message::Message,
///     ) {
///         context.reply(message.tag(), message.payload().to_vec());
///     }
/// }
///
/// let script = Script::new(ScriptId::new(0x1001), "echo", || Box::new(Echo));
/// assert_eq!(script.name(), "echo");
/// ```
#[derive(Clone)]
pub struct Script {
    id: ScriptId,
    name: &'static str,
    constructor: Constructor,
}

impl Script {
    /// Build a script record.
    pub fn new(
        id: ScriptId,
        name: &'static str,
        constructor: impl Fn() -> Box<dyn Behavior> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id,
            name,
            constructor: Arc::new(constructor),
        }
    }

    /// The script identifier.
    pub fn id(&self) -> ScriptId {
        self.id
    }

    /// The human-readable script name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Construct fresh concrete state for one actor.
    pub(crate) fn instantiate(&self) -> Box<dyn Behavior> {
        (self.constructor)()
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Script")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

/// Script registration failures.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ScriptError {
    /// A script with this identifier is already registered.
    #[error("duplicate script registration: {0}")]
    Duplicate(ScriptId),
}

/// The node's registry of scripts, keyed by identifier.
///
/// Registration is expected to be rare and batched at boot; the table sits
/// behind the node's script lock.
#[derive(Default)]
pub struct ScriptTable {
    scripts: HashMap<i32, Script>,
}

impl ScriptTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `script`. Duplicate identifiers are a configuration error.
    pub fn register(&mut self, script: Script) -> Result<(), ScriptError> {
        let id = script.id();
        if self.scripts.contains_key(&id.value()) {
            return Err(ScriptError::Duplicate(id));
        }
        self.scripts.insert(id.value(), script);
        Ok(())
    }

    /// Look up a script by identifier.
    pub fn find(&self, id: ScriptId) -> Option<&Script> {
        self.scripts.get(&id.value())
    }

    /// Number of registered scripts.
    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Nop;
    impl Behavior for Nop {
        fn receive(&mut self, _context: &mut ActorContext<'_>, _message: &Message) {}
    }

    fn nop_script(id: i32) -> Script {
        Script::new(ScriptId::new(id), "nop", || Box::new(Nop))
    }

    #[test]
    fn test_register_and_find() {
        let mut table = ScriptTable::new();
        assert!(table.register(nop_script(1)).is_ok());
        assert!(table.find(ScriptId::new(1)).is_some());
        assert!(table.find(ScriptId::new(2)).is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut table = ScriptTable::new();
        assert!(table.register(nop_script(7)).is_ok());
        assert_eq!(
            table.register(nop_script(7)),
            Err(ScriptError::Duplicate(ScriptId::new(7)))
        );
    }

    #[test]
    fn test_instantiate_produces_fresh_state() {
        struct Counting {
            seen: u32,
        }
        impl Behavior for Counting {
            fn receive(&mut self, _context: &mut ActorContext<'_>, _message: &Message) {
                self.seen += 1;
            }
        }

        let script = Script::new(ScriptId::new(2), "counting", || {
            Box::new(Counting { seen: 0 })
        });
        // Each instantiation is its own state, not a shared one.
        let a = script.instantiate();
        let b = script.instantiate();
        assert_ne!(
            &*a as *const dyn Behavior as *const u8,
            &*b as *const dyn Behavior as *const u8
        );
    }

    #[test]
    fn test_script_debug_omits_constructor() {
        let script = nop_script(0x42);
        let debug = format!("{script:?}");
        assert!(debug.contains("0x42") || debug.contains("66"));
        assert!(debug.contains("nop"));
    }
}
