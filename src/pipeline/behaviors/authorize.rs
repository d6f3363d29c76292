//! Authorization behavior.

use async_trait::async_trait;
use tracing::debug;

use crate::pipeline::{Behavior, Execution, Next, PipelineError, PipelineResult};
use crate::request::Request;

/// Rejects unauthorized principals before any data access.
///
/// Requests that declare no required scope pass through (anonymous access is
/// the request type's decision, not the pipeline's).
pub struct AuthorizeBehavior;

#[async_trait]
impl<R: Request> Behavior<R> for AuthorizeBehavior {
    async fn handle(
        &self,
        ctx: &mut Execution,
        request: &R,
        next: Next<'_, R>,
    ) -> PipelineResult<Option<R::Response>> {
        if let Some(scope) = request.required_scope() {
            match ctx.principal() {
                None => {
                    debug!(request = R::NAME, "rejecting unauthenticated request");
                    return Err(PipelineError::AccessDenied {
                        reason: format!("{} requires an authenticated principal", R::NAME),
                    });
                }
                Some(principal) if !principal.has_scope(scope) => {
                    debug!(request = R::NAME, scope, "rejecting principal without scope");
                    return Err(PipelineError::AccessDenied {
                        reason: format!("missing required scope: {scope}"),
                    });
                }
                Some(_) => {}
            }
        }
        next.run(ctx, request).await
    }
}
