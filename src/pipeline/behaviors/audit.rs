//! Audit behavior for mutations.

use async_trait::async_trait;
use chrono::Utc;

use crate::pipeline::{Behavior, Execution, Next, PipelineResult};
use crate::request::{Entity, Request};

/// Stamps audit metadata on the entity returned by a successful mutation.
///
/// Active only for commands whose entity exposes the audit shape.
pub struct AuditBehavior;

#[async_trait]
impl<R: Request> Behavior<R> for AuditBehavior {
    async fn handle(
        &self,
        ctx: &mut Execution,
        request: &R,
        next: Next<'_, R>,
    ) -> PipelineResult<Option<R::Response>> {
        let mut response = next.run(ctx, request).await?;
        if let Some(entity) = response.as_mut() {
            let actor = ctx.principal().map(|p| p.subject.clone());
            entity.stamp(actor.as_deref(), Utc::now());
        }
        Ok(response)
    }
}
