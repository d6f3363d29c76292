//! Tiered cache stores and single-flight coordination.

pub mod flight;
pub mod http;
pub mod hybrid;
pub mod local;
pub mod store;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(test)]
mod hybrid_tests;
#[cfg(test)]
mod local_tests;

pub use flight::FlightGroup;
pub use http::HttpCacheStore;
pub use hybrid::HybridCache;
pub use local::LocalStore;
#[cfg(any(test, feature = "mock"))]
pub use mock::MemoryStore;
pub use store::{CacheEntry, CacheError, CacheResult, CacheStore, Expiration};

use std::sync::Arc;

use crate::config::Config;

/// Builds the configured store: a local tier sized by `local_capacity`,
/// fronting the shared HTTP tier when `cache_url` is set.
pub fn store_from_config(config: &Config) -> CacheResult<Arc<dyn CacheStore>> {
    let local = Arc::new(LocalStore::from_config(config));
    match HttpCacheStore::from_config(config)? {
        Some(shared) => Ok(Arc::new(HybridCache::new(local, Arc::new(shared)))),
        None => Ok(local),
    }
}
