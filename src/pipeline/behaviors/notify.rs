//! Change-notification behavior for commands.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use crate::notify::{ChangeNotice, NotificationSink};
use crate::pipeline::{Behavior, Execution, Next, PipelineResult};
use crate::request::{Entity, Operation, Request};

/// Publishes one change notice per successful mutation.
///
/// Delivery is best-effort: sink failures are logged, not propagated. A
/// request cancelled after the write committed skips the publish but still
/// returns the committed result.
pub struct NotifyBehavior {
    sink: Arc<dyn NotificationSink>,
}

impl NotifyBehavior {
    /// Wraps a sink.
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl<R: Request> Behavior<R> for NotifyBehavior {
    async fn handle(
        &self,
        ctx: &mut Execution,
        request: &R,
        next: Next<'_, R>,
    ) -> PipelineResult<Option<R::Response>> {
        let response = next.run(ctx, request).await?;

        // No entity affected (e.g. mutation of a nonexistent id): nothing
        // changed, so nothing to announce.
        if response.is_none() {
            debug!(request = R::NAME, "no entity affected, skipping change notice");
            return Ok(response);
        }

        if ctx.cancellation().is_cancelled() {
            debug!(request = R::NAME, "cancelled after commit, skipping change notice");
            return Ok(response);
        }

        let notice = ChangeNotice {
            entity: <R::Response as Entity>::entity_name().to_string(),
            operation: R::KIND.operation().unwrap_or(Operation::Other),
            principal: ctx.principal().map(|p| p.subject.clone()),
            occurred_at: Utc::now(),
        };

        if let Err(e) = self.sink.publish(notice).await {
            warn!(request = R::NAME, error = %e, "change notice delivery failed");
        }

        Ok(response)
    }
}
