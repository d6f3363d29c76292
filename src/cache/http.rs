//! Shared (distributed) cache tier over HTTP.
//!
//! Thin reqwest client against a cache service:
//! `GET /cache/{key}`, `PUT /cache`, `DELETE /cache/{key}`,
//! `DELETE /cache/tags/{tag}`. The service owns expiration bookkeeping for
//! the shared tier; entries carry their policy on the wire.

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use super::store::{CacheEntry, CacheError, CacheResult, CacheStore};

/// HTTP-backed distributed cache tier.
#[derive(Debug, Clone)]
pub struct HttpCacheStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCacheStore {
    /// Creates a store talking to `base_url` with a default client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Creates a store from configuration, or `None` when no cache service
    /// URL is configured. The outbound timeout applies to every call.
    pub fn from_config(config: &crate::config::Config) -> CacheResult<Option<Self>> {
        let Some(url) = config.cache_url.as_deref() else {
            return Ok(None);
        };
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()?;
        Ok(Some(Self::with_client(client, url)))
    }

    /// Creates a store with a caller-configured client (timeouts, proxies).
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { client, base_url }
    }

    fn entry_url(&self, key: &str) -> String {
        format!("{}/cache/{}", self.base_url, key)
    }

    fn tag_url(&self, tag: &str) -> String {
        format!("{}/cache/tags/{}", self.base_url, tag)
    }

    fn check(status: StatusCode) -> CacheResult<()> {
        if status.is_success() {
            Ok(())
        } else {
            Err(CacheError::Unavailable {
                reason: format!("cache service returned {status}"),
            })
        }
    }
}

#[async_trait]
impl CacheStore for HttpCacheStore {
    async fn get(&self, key: &str) -> CacheResult<Option<CacheEntry>> {
        let response = self.client.get(self.entry_url(key)).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::check(response.status())?;

        let entry: CacheEntry = response.json().await?;
        debug!(key, "distributed tier hit");
        Ok(Some(entry))
    }

    async fn set(&self, entry: CacheEntry) -> CacheResult<()> {
        let response = self
            .client
            .put(format!("{}/cache", self.base_url))
            .json(&entry)
            .send()
            .await?;
        Self::check(response.status())
    }

    async fn remove(&self, key: &str) -> CacheResult<()> {
        let response = self.client.delete(self.entry_url(key)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::check(response.status())
    }

    async fn remove_by_tag(&self, tag: &str) -> CacheResult<()> {
        let response = self.client.delete(self.tag_url(tag)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::check(response.status())
    }
}
