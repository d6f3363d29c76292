//! Per-key single-flight latches.
//!
//! For a given cache key, at most one population runs at a time. The leader
//! holds the key's latch while it executes the handler and writes the entry;
//! waiters queue on the same latch and re-check the cache once admitted. A
//! leader that fails or is cancelled releases the latch on drop, so a waiter
//! can take over instead of deadlocking.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;

/// Latch map size that triggers a sweep of dead entries.
const SWEEP_THRESHOLD: usize = 64;

/// Keyed collection of single-flight latches.
///
/// Latches are held by `Weak` reference; once the last flight for a key
/// lands, the latch is dropped and the slot becomes sweepable.
#[derive(Default)]
pub struct FlightGroup {
    latches: Mutex<HashMap<String, Weak<AsyncMutex<()>>>>,
}

impl FlightGroup {
    /// Creates an empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the latch for `key`, creating it if no flight is active.
    pub fn latch(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut latches = self.latches.lock();

        if let Some(existing) = latches.get(key).and_then(Weak::upgrade) {
            return existing;
        }

        if latches.len() >= SWEEP_THRESHOLD {
            latches.retain(|_, latch| latch.strong_count() > 0);
        }

        let fresh = Arc::new(AsyncMutex::new(()));
        latches.insert(key.to_owned(), Arc::downgrade(&fresh));
        fresh
    }

    /// Number of keys with an active flight.
    pub fn in_flight(&self) -> usize {
        self.latches
            .lock()
            .values()
            .filter(|latch| latch.strong_count() > 0)
            .count()
    }
}

impl std::fmt::Debug for FlightGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlightGroup")
            .field("in_flight", &self.in_flight())
            .finish()
    }
}
