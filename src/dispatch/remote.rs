//! Remote dispatcher.
//!
//! Serializes the request into an [`Envelope`], POSTs it to a
//! [`RemoteHost`](super::RemoteHost), and decodes the reply. When a
//! client-side cache store is configured, the full caching contract from the
//! pipeline's cache behavior is replicated around the network call:
//! get-or-populate with single-flight, fail-open on store errors, and a tag
//! sweep after a successful invalidating command. Caching can therefore
//! exist at the client tier, the server pipeline tier, or both.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::wire::{Envelope, Problem, Reply};
use super::{Dispatch, DispatchError, DispatchResult};
use crate::cache::{CacheEntry, CacheStore, FlightGroup};
use crate::keys::KeyScope;
use crate::pipeline::PipelineError;
use crate::principal::Principal;
use crate::request::Request;

/// Client-side dispatcher for a remote pipeline host.
#[derive(Clone)]
pub struct RemoteDispatcher {
    client: reqwest::Client,
    base_url: String,
    cache: Option<Arc<dyn CacheStore>>,
    flight: Arc<FlightGroup>,
}

impl RemoteDispatcher {
    /// Creates a dispatcher for `base_url` with a default client and no
    /// client-side cache.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Creates a dispatcher from configuration: target URL plus the outbound
    /// timeout. Pair with [`store_from_config`](crate::cache::store_from_config)
    /// and [`RemoteDispatcher::with_cache`] for a client-side mirror.
    pub fn from_config(config: &crate::config::Config) -> DispatchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()?;
        Ok(Self::with_client(client, config.remote_url.clone()))
    }

    /// Creates a dispatcher with a caller-configured client.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client,
            base_url,
            cache: None,
            flight: Arc::new(FlightGroup::new()),
        }
    }

    /// Enables the client-side cache mirror.
    pub fn with_cache(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(store);
        self
    }

    /// One round-trip: envelope out, reply or problem in.
    async fn call<R: Request>(
        &self,
        principal: Option<Principal>,
        request: &R,
    ) -> DispatchResult<Option<R::Response>> {
        let envelope = Envelope::new(principal, request)?;
        debug!(request = R::NAME, correlation = %envelope.id, "dispatching remotely");

        let response = self
            .client
            .post(format!("{}/dispatch", self.base_url))
            .json(&envelope)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            // A malformed success body is a transport failure, not an
            // application error.
            let reply: Reply = response.json().await?;
            return Ok(serde_json::from_value(reply.body)?);
        }

        match response.json::<Problem>().await {
            Ok(problem) => Err(DispatchError::Remote {
                status: problem.code,
                message: problem.error,
            }),
            Err(e) => Err(DispatchError::Transport(e)),
        }
    }

    /// Fail-open client-side lookup; mirrors the pipeline cache behavior.
    async fn mirror_lookup<R: Request>(
        &self,
        store: &Arc<dyn CacheStore>,
        key: &str,
    ) -> Option<Option<R::Response>> {
        match store.get(key).await {
            Ok(Some(entry)) => match serde_json::from_value::<Option<R::Response>>(entry.value) {
                Ok(decoded) => {
                    debug!(key, "client-side cache hit");
                    Some(decoded)
                }
                Err(e) => {
                    warn!(key, error = %e, "client-side entry undecodable, treating as miss");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key, error = %e, "client-side cache unavailable, calling remote");
                None
            }
        }
    }

    /// Get-or-populate around the network call, single-flight per key.
    async fn cached_call<R: Request>(
        &self,
        store: &Arc<dyn CacheStore>,
        principal: Option<Principal>,
        request: &R,
        cancel: &CancellationToken,
    ) -> DispatchResult<Option<R::Response>> {
        let expiry = match request.expiry() {
            Some(expiry) => expiry,
            None => {
                return tokio::select! {
                    result = self.call(principal, request) => result,
                    () = cancel.cancelled() => {
                        Err(DispatchError::Pipeline(PipelineError::Cancelled))
                    }
                };
            }
        };

        let scope = KeyScope::from_principal(principal.as_ref());
        let key = request.cache_key(&scope);

        if let Some(hit) = self.mirror_lookup::<R>(store, &key).await {
            return Ok(hit);
        }

        let latch = self.flight.latch(&key);
        let _permit = tokio::select! {
            permit = latch.lock() => permit,
            () = cancel.cancelled() => {
                return Err(DispatchError::Pipeline(PipelineError::Cancelled));
            }
        };

        if let Some(hit) = self.mirror_lookup::<R>(store, &key).await {
            return Ok(hit);
        }

        // Racing the round trip against cancellation also releases the
        // flight latch promptly, so a waiter can take over as leader.
        let response = tokio::select! {
            result = self.call(principal, request) => result?,
            () = cancel.cancelled() => {
                return Err(DispatchError::Pipeline(PipelineError::Cancelled));
            }
        };

        match serde_json::to_value(&response) {
            Ok(value) => {
                let entry = CacheEntry::new(key.clone(), request.cache_tag(), value, expiry);
                if let Err(e) = store.set(entry).await {
                    warn!(key, error = %e, "client-side cache population failed");
                }
            }
            Err(e) => {
                warn!(key, error = %e, "response not serializable, skipping client-side cache");
            }
        }

        Ok(response)
    }
}

impl std::fmt::Debug for RemoteDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteDispatcher")
            .field("base_url", &self.base_url)
            .field("cached", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Dispatch for RemoteDispatcher {
    async fn send_with<R: Request>(
        &self,
        principal: Option<Principal>,
        request: R,
        cancel: CancellationToken,
    ) -> DispatchResult<Option<R::Response>> {
        let response = if R::CACHEABLE && !R::KIND.is_command() {
            match &self.cache {
                Some(store) => {
                    self.cached_call(store, principal, &request, &cancel)
                        .await?
                }
                None => {
                    tokio::select! {
                        result = self.call(principal, &request) => result?,
                        () = cancel.cancelled() => {
                            return Err(DispatchError::Pipeline(PipelineError::Cancelled));
                        }
                    }
                }
            }
        } else {
            tokio::select! {
                result = self.call(principal, &request) => result?,
                () = cancel.cancelled() => {
                    return Err(DispatchError::Pipeline(PipelineError::Cancelled));
                }
            }
        };

        // Mirror the pipeline's invalidation contract: sweep after success
        // only, fail-open on store errors.
        if R::INVALIDATES {
            if let Some(store) = &self.cache {
                if let Some(tag) = request.invalidation_tag() {
                    match store.remove_by_tag(&tag).await {
                        Ok(()) => debug!(request = R::NAME, tag, "client-side tag swept"),
                        Err(e) => {
                            warn!(request = R::NAME, tag, error = %e, "client-side tag sweep failed")
                        }
                    }
                }
            }
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalization() {
        let dispatcher = RemoteDispatcher::new("http://pipeline.internal:8080///");
        assert_eq!(dispatcher.base_url, "http://pipeline.internal:8080");
    }

    #[test]
    fn test_from_config_targets_remote_url() {
        let config = crate::config::Config {
            remote_url: "http://pipeline.internal:8080/".to_string(),
            http_timeout_ms: 250,
            ..Default::default()
        };

        let dispatcher = RemoteDispatcher::from_config(&config).unwrap();
        assert_eq!(dispatcher.base_url, "http://pipeline.internal:8080");
        assert!(dispatcher.cache.is_none());
    }
}
