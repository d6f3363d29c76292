//! In-memory distributed-tier stand-in for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::store::{CacheEntry, CacheError, CacheResult, CacheStore};

struct MockSlot {
    entry: CacheEntry,
    deadline: Instant,
}

/// Distributed-tier stand-in with explicit expiration bookkeeping and an
/// outage toggle for fail-open tests.
#[derive(Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, MockSlot>>,
    unavailable: AtomicBool,
    gets: AtomicUsize,
    sets: AtomicUsize,
}

impl MemoryStore {
    /// Creates an empty, available store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates an outage (`false`) or recovery (`true`).
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Number of `get` calls, including failed ones.
    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Number of successful `set` calls.
    pub fn set_count(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    /// Number of live (non-expired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.slots
            .lock()
            .values()
            .filter(|slot| slot.deadline > now)
            .count()
    }

    /// Returns `true` if no live entry exists.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if a live entry exists for `key`.
    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.slots
            .lock()
            .get(key)
            .is_some_and(|slot| slot.deadline > now)
    }

    fn ensure_available(&self) -> CacheResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(CacheError::Unavailable {
                reason: "simulated outage".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> CacheResult<Option<CacheEntry>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.ensure_available()?;

        let now = Instant::now();
        let mut slots = self.slots.lock();
        let Some(slot) = slots.get_mut(key) else {
            return Ok(None);
        };

        if slot.deadline <= now {
            slots.remove(key);
            return Ok(None);
        }

        if slot.entry.expiry.is_sliding() {
            slot.deadline = now + slot.entry.expiry.window();
        }
        Ok(Some(slot.entry.clone()))
    }

    async fn set(&self, entry: CacheEntry) -> CacheResult<()> {
        self.ensure_available()?;
        self.sets.fetch_add(1, Ordering::SeqCst);

        let deadline = Instant::now() + entry.expiry.window();
        self.slots
            .lock()
            .insert(entry.key.clone(), MockSlot { entry, deadline });
        Ok(())
    }

    async fn remove(&self, key: &str) -> CacheResult<()> {
        self.ensure_available()?;
        self.slots.lock().remove(key);
        Ok(())
    }

    async fn remove_by_tag(&self, tag: &str) -> CacheResult<()> {
        self.ensure_available()?;
        self.slots
            .lock()
            .retain(|_, slot| slot.entry.tag.as_deref() != Some(tag));
        Ok(())
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("entries", &self.slots.lock().len())
            .field("unavailable", &self.unavailable.load(Ordering::SeqCst))
            .finish()
    }
}
