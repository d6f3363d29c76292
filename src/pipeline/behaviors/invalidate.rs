//! Tag invalidation behavior for commands.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::cache::CacheStore;
use crate::pipeline::{Behavior, Execution, Next, PipelineResult};
use crate::request::Request;

/// Sweeps the command's invalidation tag after — and only after — the
/// handler succeeds. The sweep completes before the command returns, so the
/// caller may assume subsequent reads miss the cache. A store failure is
/// logged, not propagated: a cache outage never fails the mutation that
/// already committed.
pub struct InvalidateBehavior {
    store: Arc<dyn CacheStore>,
}

impl InvalidateBehavior {
    /// Wraps a store.
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<R: Request> Behavior<R> for InvalidateBehavior {
    async fn handle(
        &self,
        ctx: &mut Execution,
        request: &R,
        next: Next<'_, R>,
    ) -> PipelineResult<Option<R::Response>> {
        let response = next.run(ctx, request).await?;

        if let Some(tag) = request.invalidation_tag() {
            match self.store.remove_by_tag(&tag).await {
                Ok(()) => debug!(request = R::NAME, tag, "cache tag swept"),
                Err(e) => {
                    warn!(request = R::NAME, tag, error = %e, "cache tag sweep failed")
                }
            }
        }

        Ok(response)
    }
}
