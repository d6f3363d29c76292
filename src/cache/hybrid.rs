//! Hybrid cache: local tier fronting a shared distributed tier.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use super::local::LocalStore;
use super::store::{CacheEntry, CacheResult, CacheStore};

/// Combines the local and distributed tiers behind one [`CacheStore`].
///
/// Lookup checks the local tier first; a distributed hit is written through
/// to the local tier before it is returned. Writes and tag sweeps go to both
/// tiers. A distributed-tier failure is logged and degraded, never
/// propagated: the hybrid answers from whatever the local tier knows.
pub struct HybridCache {
    local: Arc<LocalStore>,
    distributed: Arc<dyn CacheStore>,
}

impl HybridCache {
    /// Combines the two tiers.
    pub fn new(local: Arc<LocalStore>, distributed: Arc<dyn CacheStore>) -> Self {
        Self { local, distributed }
    }

    /// The local tier.
    pub fn local(&self) -> &Arc<LocalStore> {
        &self.local
    }

    /// The distributed tier.
    pub fn distributed(&self) -> &Arc<dyn CacheStore> {
        &self.distributed
    }
}

impl std::fmt::Debug for HybridCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridCache")
            .field("local", &self.local)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CacheStore for HybridCache {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> CacheResult<Option<CacheEntry>> {
        if let Some(entry) = self.local.get(key).await? {
            debug!(key, "local tier hit");
            return Ok(Some(entry));
        }

        match self.distributed.get(key).await {
            Ok(Some(entry)) => {
                debug!(key, "distributed tier hit, writing through to local");
                if let Err(e) = self.local.set(entry.clone()).await {
                    warn!(key, error = %e, "local write-through failed");
                }
                Ok(Some(entry))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                warn!(key, error = %e, "distributed tier lookup failed, degrading to miss");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, entry), fields(key = %entry.key))]
    async fn set(&self, entry: CacheEntry) -> CacheResult<()> {
        self.local.set(entry.clone()).await?;
        if let Err(e) = self.distributed.set(entry).await {
            warn!(error = %e, "distributed tier write failed, entry is local-only");
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> CacheResult<()> {
        self.local.remove(key).await?;
        if let Err(e) = self.distributed.remove(key).await {
            warn!(key, error = %e, "distributed tier removal failed");
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_by_tag(&self, tag: &str) -> CacheResult<()> {
        self.local.remove_by_tag(tag).await?;
        if let Err(e) = self.distributed.remove_by_tag(tag).await {
            warn!(tag, error = %e, "distributed tier tag sweep failed");
        }
        Ok(())
    }
}
