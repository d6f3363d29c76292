//! Validation behavior.

use async_trait::async_trait;
use tracing::debug;

use crate::pipeline::{Behavior, Execution, Next, PipelineError, PipelineResult};
use crate::request::Request;

/// Runs entity-level then whole-request rules, short-circuiting before the
/// handler on the first failing set.
///
/// Translation is this behavior's explicit contract: rule violations become
/// [`PipelineError::Validation`] with field-level detail rather than a raw
/// handler error.
pub struct ValidationBehavior;

#[async_trait]
impl<R: Request> Behavior<R> for ValidationBehavior {
    async fn handle(
        &self,
        ctx: &mut Execution,
        request: &R,
        next: Next<'_, R>,
    ) -> PipelineResult<Option<R::Response>> {
        if let Err(failures) = request.validate_entity() {
            debug!(request = R::NAME, failures = failures.failures.len(), "entity validation failed");
            return Err(PipelineError::Validation(failures));
        }
        if let Err(failures) = request.validate() {
            debug!(request = R::NAME, failures = failures.failures.len(), "request validation failed");
            return Err(PipelineError::Validation(failures));
        }
        next.run(ctx, request).await
    }
}
