//! Local in-process cache tier.
//!
//! Backed by a moka cache with a per-entry expiration policy and a tag index
//! for bulk removal. The eviction listener keeps the tag index in sync when
//! moka expires or evicts entries on its own.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::sync::Cache;
use parking_lot::Mutex;

use super::store::{CacheEntry, CacheResult, CacheStore};

type TagIndex = Arc<Mutex<HashMap<String, HashSet<String>>>>;

/// Maps each entry's declared policy onto moka's expiry hooks: the window is
/// set at insert, and sliding entries renew it on every read.
struct PolicyExpiry;

impl Expiry<String, Arc<CacheEntry>> for PolicyExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Arc<CacheEntry>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.expiry.window())
    }

    fn expire_after_read(
        &self,
        _key: &String,
        value: &Arc<CacheEntry>,
        _read_at: Instant,
        duration_until_expiry: Option<Duration>,
        _last_modified_at: Instant,
    ) -> Option<Duration> {
        if value.expiry.is_sliding() {
            Some(value.expiry.window())
        } else {
            duration_until_expiry
        }
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Arc<CacheEntry>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.expiry.window())
    }
}

/// In-process cache tier.
pub struct LocalStore {
    entries: Cache<String, Arc<CacheEntry>>,
    tags: TagIndex,
}

impl LocalStore {
    /// Default max entry count.
    pub const DEFAULT_CAPACITY: u64 = 10_000;

    /// Creates a store with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Creates a store sized from configuration.
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::with_capacity(config.local_capacity)
    }

    /// Creates a store with a max entry capacity (LRU-style eviction).
    pub fn with_capacity(capacity: u64) -> Self {
        let tags: TagIndex = Arc::new(Mutex::new(HashMap::new()));
        let listener_tags = tags.clone();

        let entries = Cache::builder()
            .max_capacity(capacity)
            .expire_after(PolicyExpiry)
            .eviction_listener(move |key: Arc<String>, value: Arc<CacheEntry>, _cause| {
                if let Some(tag) = value.tag.as_deref() {
                    let mut index = listener_tags.lock();
                    if let Some(keys) = index.get_mut(tag) {
                        keys.remove(key.as_str());
                        if keys.is_empty() {
                            index.remove(tag);
                        }
                    }
                }
            })
            .build();

        Self { entries, tags }
    }

    /// Number of live entries (approximate until pending tasks run).
    pub fn len(&self) -> u64 {
        self.entries.entry_count()
    }

    /// Returns `true` if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.entry_count() == 0
    }

    /// Returns `true` if a live entry exists for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Drops all entries and the tag index.
    pub fn clear(&self) {
        self.entries.invalidate_all();
        self.tags.lock().clear();
    }

    /// Runs moka's pending maintenance tasks (tests use this to make
    /// `len` exact).
    pub fn run_pending_tasks(&self) {
        self.entries.run_pending_tasks();
    }

    /// Keys currently indexed under `tag`.
    pub fn keys_for_tag(&self, tag: &str) -> Vec<String> {
        self.tags
            .lock()
            .get(tag)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}

#[async_trait]
impl CacheStore for LocalStore {
    async fn get(&self, key: &str) -> CacheResult<Option<CacheEntry>> {
        Ok(self.entries.get(key).map(|entry| (*entry).clone()))
    }

    async fn set(&self, entry: CacheEntry) -> CacheResult<()> {
        if let Some(tag) = entry.tag.clone() {
            self.tags
                .lock()
                .entry(tag)
                .or_default()
                .insert(entry.key.clone());
        }
        self.entries.insert(entry.key.clone(), Arc::new(entry));
        Ok(())
    }

    async fn remove(&self, key: &str) -> CacheResult<()> {
        self.entries.invalidate(key);
        Ok(())
    }

    async fn remove_by_tag(&self, tag: &str) -> CacheResult<()> {
        let keys = self.tags.lock().remove(tag);
        if let Some(keys) = keys {
            for key in keys {
                self.entries.invalidate(&key);
            }
        }
        Ok(())
    }
}
