//! Node event counters.
//!
//! Critical-path anomalies (unroutable sends, decode failures) are counted
//! rather than escalated; `--print-counters` reports them at shutdown.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicU64, Ordering};

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
// (none)

/// Atomic counter block shared between the node and its workers.
#[derive(Default)]
pub struct NodeCounters {
    spawned_actors: AtomicU64,
    dead_actors: AtomicU64,
    local_deliveries: AtomicU64,
    remote_deliveries: AtomicU64,
    dropped_unroutable: AtomicU64,
    decode_failures: AtomicU64,
    spawn_failures: AtomicU64,
}

/// A point-in-time copy of every counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CountersSnapshot {
    pub spawned_actors: u64,
    pub dead_actors: u64,
    pub local_deliveries: u64,
    pub remote_deliveries: u64,
    pub dropped_unroutable: u64,
    pub decode_failures: u64,
    pub spawn_failures: u64,
}

impl NodeCounters {
    pub(crate) fn record_spawn(&self) {
        self.spawned_actors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_death(&self) {
        self.dead_actors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_local_delivery(&self) {
        self.local_deliveries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_remote_delivery(&self) {
        self.remote_deliveries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped_unroutable(&self) {
        self.dropped_unroutable.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_spawn_failure(&self) {
        self.spawn_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy every counter.
    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            spawned_actors: self.spawned_actors.load(Ordering::Relaxed),
            dead_actors: self.dead_actors.load(Ordering::Relaxed),
            local_deliveries: self.local_deliveries.load(Ordering::Relaxed),
            remote_deliveries: self.remote_deliveries.load(Ordering::Relaxed),
            dropped_unroutable: self.dropped_unroutable.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            spawn_failures: self.spawn_failures.load(Ordering::Relaxed),
        }
    }
}
