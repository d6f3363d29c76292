//! Cache store contract shared by every tier.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Per-entry expiration policy.
///
/// A request declares at most one. Absolute fires at a fixed point after
/// insertion regardless of access; sliding resets its countdown on every hit
/// and expires only after a contiguous idle period. Durations travel as
/// milliseconds so entries round-trip through the distributed tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expiration {
    /// Expires `after_ms` after insertion.
    Absolute {
        /// Milliseconds from insertion to expiry.
        after_ms: u64,
    },
    /// Expires after `idle_ms` without a hit.
    Sliding {
        /// Idle window in milliseconds.
        idle_ms: u64,
    },
}

impl Expiration {
    /// Absolute policy from a duration.
    pub fn absolute(after: Duration) -> Self {
        Self::Absolute {
            after_ms: after.as_millis() as u64,
        }
    }

    /// Sliding policy from a duration.
    pub fn sliding(idle: Duration) -> Self {
        Self::Sliding {
            idle_ms: idle.as_millis() as u64,
        }
    }

    /// The policy's window as a duration.
    pub fn window(&self) -> Duration {
        match self {
            Self::Absolute { after_ms } => Duration::from_millis(*after_ms),
            Self::Sliding { idle_ms } => Duration::from_millis(*idle_ms),
        }
    }

    /// Returns `true` for the sliding policy.
    pub fn is_sliding(&self) -> bool {
        matches!(self, Self::Sliding { .. })
    }
}

/// One cached response.
///
/// `value` is the serialized `Option<Response>`; JSON `null` is a legitimate
/// cached "not found". Entries carry their policy so a tier adopted from
/// another (hybrid write-through) keeps the declared semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Unique key per (request type, parameters, principal scope).
    pub key: String,
    /// Coarse invalidation tag, if the request declared one.
    pub tag: Option<String>,
    /// Serialized response.
    pub value: serde_json::Value,
    /// Declared expiration policy.
    pub expiry: Expiration,
}

impl CacheEntry {
    /// Builds an entry.
    pub fn new(
        key: impl Into<String>,
        tag: Option<String>,
        value: serde_json::Value,
        expiry: Expiration,
    ) -> Self {
        Self {
            key: key.into(),
            tag,
            value,
            expiry,
        }
    }
}

/// Errors returned by cache stores.
///
/// Callers on the request path treat every variant as fail-open: a cache
/// outage degrades performance, never correctness.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The store cannot be reached or refused the operation.
    #[error("cache store unavailable: {reason}")]
    Unavailable {
        /// Error message.
        reason: String,
    },

    /// HTTP transport failure talking to a shared tier.
    #[error("cache transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A stored payload failed to decode.
    #[error("cache payload decode failed: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Convenience result type for store operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Abstract tiered key/value store with tag-based bulk removal.
///
/// Implementations: [`LocalStore`](crate::cache::LocalStore) (in-process),
/// [`HttpCacheStore`](crate::cache::HttpCacheStore) (shared service), and
/// [`HybridCache`](crate::cache::HybridCache) (both).
#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    /// Looks up a live entry, honoring its expiration policy.
    async fn get(&self, key: &str) -> CacheResult<Option<CacheEntry>>;

    /// Inserts an entry, indexing its tag.
    async fn set(&self, entry: CacheEntry) -> CacheResult<()>;

    /// Removes one entry by key.
    async fn remove(&self, key: &str) -> CacheResult<()>;

    /// Removes every live entry carrying `tag`, regardless of key.
    async fn remove_by_tag(&self, tag: &str) -> CacheResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiration_windows() {
        let absolute = Expiration::absolute(Duration::from_secs(3600));
        assert_eq!(absolute.window(), Duration::from_secs(3600));
        assert!(!absolute.is_sliding());

        let sliding = Expiration::sliding(Duration::from_millis(250));
        assert_eq!(sliding.window(), Duration::from_millis(250));
        assert!(sliding.is_sliding());
    }

    #[test]
    fn test_entry_round_trips_through_json() {
        let entry = CacheEntry::new(
            "Order:7:Tenant:3",
            Some("Orders".to_string()),
            serde_json::json!({ "id": 7, "total": 42 }),
            Expiration::absolute(Duration::from_secs(60)),
        );

        let encoded = serde_json::to_string(&entry).unwrap();
        let decoded: CacheEntry = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, entry);
    }
}
