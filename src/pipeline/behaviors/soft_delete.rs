//! Soft-delete behavior for delete commands.

use async_trait::async_trait;

use crate::pipeline::{Behavior, Execution, Next, PipelineResult};
use crate::request::{Entity, Request};

/// Turns a physical delete into a marking delete.
///
/// Active only for delete commands whose entity exposes the soft-delete
/// shape. Before the handler runs, the execution context is switched to
/// soft-delete mode — the repository-facing handler marks the row instead of
/// removing it. On the unwind the returned entity's flag is set, so callers
/// observe the marked state.
pub struct SoftDeleteBehavior;

#[async_trait]
impl<R: Request> Behavior<R> for SoftDeleteBehavior {
    async fn handle(
        &self,
        ctx: &mut Execution,
        request: &R,
        next: Next<'_, R>,
    ) -> PipelineResult<Option<R::Response>> {
        ctx.set_soft_delete(true);
        let mut response = next.run(ctx, request).await?;
        if let Some(entity) = response.as_mut() {
            entity.set_deleted(true);
        }
        Ok(response)
    }
}
