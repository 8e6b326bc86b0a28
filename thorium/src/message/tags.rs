//! Reserved action tags.
//!
//! Each tag is a stable 32-bit integer. The set below is closed; every
//! other tag value belongs to user scripts. Node-level tags are handled by
//! the node itself and never reach an actor's receive step.

/// Register one initial actor name with a peer node. Payload: `i32` name.
pub const NODE_ADD_INITIAL_ACTOR: i32 = 0x2438;

/// Batch-register initial actor names. Payload: packed `i32` vector.
pub const NODE_ADD_INITIAL_ACTORS: i32 = 0x4c19;

/// Acknowledge an initial-actor batch. Payload: empty.
pub const NODE_ADD_INITIAL_ACTORS_REPLY: i32 = 0x3ad3;

/// Begin the initial actors. Payload: empty.
pub const NODE_START: i32 = 0x082c;

/// User-level start, delivered to each initial actor once the cluster is
/// assembled. Payload: packed `i32` vector of all initial actor names.
pub const ACTOR_START: i32 = 0x7240;

/// User-level start acknowledgement. Payload: user-defined.
pub const ACTOR_START_REPLY: i32 = 0x7241;

/// Request termination. Dispatched to the behavior's `on_ask_to_stop`
/// hook, whose default replies with a terminal stop. Payload: empty.
pub const ACTOR_ASK_TO_STOP: i32 = 0x7242;

/// Terminal self-stop. Intercepted by the owning worker; the actor's
/// receive step never observes it. Payload: empty.
pub const ACTOR_STOP: i32 = 0x7243;

/// Request a spawn from the node. Payload: `i32` script identifier.
pub const ACTOR_SPAWN: i32 = 0x7244;

/// Spawn result. Payload: `i32` actor name.
pub const ACTOR_SPAWN_REPLY: i32 = 0x7245;

/// Query the node's worker count. Payload: empty.
pub const ACTOR_GET_NODE_WORKER_COUNT: i32 = 0x7246;

/// Worker-count answer. Payload: `i32` count.
pub const ACTOR_GET_NODE_WORKER_COUNT_REPLY: i32 = 0x7247;

/// Tags consumed by the node's own receive path (never by actors).
pub fn is_node_tag(tag: i32) -> bool {
    matches!(
        tag,
        NODE_ADD_INITIAL_ACTOR | NODE_ADD_INITIAL_ACTORS | NODE_ADD_INITIAL_ACTORS_REPLY
            | NODE_START
    )
}

/// Tags the node answers on behalf of actors during routing.
pub fn is_node_serviced_tag(tag: i32) -> bool {
    matches!(tag, ACTOR_SPAWN | ACTOR_GET_NODE_WORKER_COUNT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_tags_are_closed_set() {
        assert!(is_node_tag(NODE_ADD_INITIAL_ACTOR));
        assert!(is_node_tag(NODE_ADD_INITIAL_ACTORS));
        assert!(is_node_tag(NODE_ADD_INITIAL_ACTORS_REPLY));
        assert!(is_node_tag(NODE_START));
        assert!(!is_node_tag(ACTOR_START));
        assert!(!is_node_tag(0));
    }

    #[test]
    fn test_node_serviced_tags() {
        assert!(is_node_serviced_tag(ACTOR_SPAWN));
        assert!(is_node_serviced_tag(ACTOR_GET_NODE_WORKER_COUNT));
        assert!(!is_node_serviced_tag(ACTOR_SPAWN_REPLY));
    }

    #[test]
    fn test_tag_values_are_stable() {
        assert_eq!(NODE_ADD_INITIAL_ACTOR, 0x2438);
        assert_eq!(NODE_ADD_INITIAL_ACTORS, 0x4c19);
        assert_eq!(NODE_ADD_INITIAL_ACTORS_REPLY, 0x3ad3);
        assert_eq!(NODE_START, 0x082c);
    }
}
