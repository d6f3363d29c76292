//! Tiered cache behavior for queries.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::cache::{CacheEntry, CacheStore, FlightGroup};
use crate::pipeline::{Behavior, Execution, Next, PipelineError, PipelineResult};
use crate::request::Request;

/// Wraps query execution in get-or-populate with single-flight protection.
///
/// Per call: compute the key from the request and principal scope; skip
/// entirely when the request declares no expiration (cacheability is opt-in
/// per call); fast-path lookup; on miss, take the key's flight latch,
/// re-check, run the continuation, and populate on success only. Every store
/// failure is fail-open: logged and treated as a miss, never surfaced.
pub struct CacheBehavior {
    store: Arc<dyn CacheStore>,
    flight: Arc<FlightGroup>,
}

impl CacheBehavior {
    /// Wraps a store and a flight group.
    pub fn new(store: Arc<dyn CacheStore>, flight: Arc<FlightGroup>) -> Self {
        Self { store, flight }
    }

    /// Fail-open lookup. `Ok(Some(decoded))` is a hit (the decoded value may
    /// itself be `None`, a cached "not found"); `Ok(None)` is a miss. The
    /// only error out of here is cancellation.
    async fn lookup<T: DeserializeOwned>(
        &self,
        key: &str,
        ctx: &Execution,
    ) -> PipelineResult<Option<Option<T>>> {
        let cancel = ctx.cancellation().clone();
        let fetched = tokio::select! {
            fetched = self.store.get(key) => fetched,
            () = cancel.cancelled() => return Err(PipelineError::Cancelled),
        };

        match fetched {
            Ok(Some(entry)) => match serde_json::from_value::<Option<T>>(entry.value) {
                Ok(decoded) => {
                    debug!(key, "cache hit");
                    Ok(Some(decoded))
                }
                Err(e) => {
                    warn!(key, error = %e, "cached payload undecodable, treating as miss");
                    Ok(None)
                }
            },
            Ok(None) => Ok(None),
            Err(e) => {
                warn!(key, error = %e, "cache tier unavailable, falling through to handler");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl<R: Request> Behavior<R> for CacheBehavior {
    async fn handle(
        &self,
        ctx: &mut Execution,
        request: &R,
        next: Next<'_, R>,
    ) -> PipelineResult<Option<R::Response>> {
        let Some(expiry) = request.expiry() else {
            return next.run(ctx, request).await;
        };

        let scope = ctx.key_scope();
        let key = request.cache_key(&scope);

        if let Some(hit) = self.lookup(&key, ctx).await? {
            return Ok(hit);
        }

        // Miss: serialize population behind the key's latch so concurrent
        // identical requests share one handler execution.
        let latch = self.flight.latch(&key);
        let cancel = ctx.cancellation().clone();
        let _permit = tokio::select! {
            permit = latch.lock() => permit,
            () = cancel.cancelled() => return Err(PipelineError::Cancelled),
        };

        if let Some(hit) = self.lookup(&key, ctx).await? {
            debug!(key, "populated while waiting on flight latch");
            return Ok(hit);
        }

        debug!(key, "cache miss, invoking handler");
        let response = next.run(ctx, request).await?;

        match serde_json::to_value(&response) {
            Ok(value) => {
                let entry = CacheEntry::new(key.clone(), request.cache_tag(), value, expiry);
                if let Err(e) = self.store.set(entry).await {
                    warn!(key, error = %e, "cache population failed, serving uncached result");
                }
            }
            Err(e) => {
                warn!(key, error = %e, "response not serializable, skipping cache population");
            }
        }

        Ok(response)
    }
}
