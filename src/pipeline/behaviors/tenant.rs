//! Tenant behavior.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::pipeline::{Behavior, Execution, Next, PipelineError, PipelineResult};
use crate::principal::TenantResolver;
use crate::request::{Entity, Request, RequestKind};

/// Resolves the tenant and enforces tenant ownership.
///
/// Active only for request types whose response entity is tenant-scoped.
/// For list/search reads the resolved tenant is injected as a filter the
/// handler must apply; for identified reads and mutations the returned
/// entity's owner is validated against the resolved tenant. Resolution
/// failure is an authorization error, never a silent default.
pub struct TenantBehavior {
    resolver: Arc<dyn TenantResolver>,
}

impl TenantBehavior {
    /// Wraps a resolver.
    pub fn new(resolver: Arc<dyn TenantResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl<R: Request> Behavior<R> for TenantBehavior {
    async fn handle(
        &self,
        ctx: &mut Execution,
        request: &R,
        next: Next<'_, R>,
    ) -> PipelineResult<Option<R::Response>> {
        let principal = match ctx.principal() {
            Some(principal) => principal.clone(),
            None => {
                return Err(PipelineError::AccessDenied {
                    reason: format!("{} is tenant-scoped and requires a principal", R::NAME),
                });
            }
        };

        let tenant =
            self.resolver
                .resolve(&principal)
                .await
                .map_err(|e| PipelineError::AccessDenied {
                    reason: format!("tenant resolution failed: {e}"),
                })?;

        ctx.set_tenant(tenant);
        if matches!(R::KIND, RequestKind::Search) {
            debug!(request = R::NAME, tenant, "injecting tenant filter");
            ctx.set_tenant_filter(tenant);
        }

        let response = next.run(ctx, request).await?;

        // Ownership check for identified reads and mutations. Search results
        // were already filtered by the injected tenant.
        if !matches!(R::KIND, RequestKind::Search) {
            if let Some(entity) = response.as_ref() {
                if let Some(owner) = entity.tenant_id() {
                    if owner != tenant {
                        debug!(request = R::NAME, tenant, owner, "tenant mismatch");
                        return Err(PipelineError::AccessDenied {
                            reason: format!("entity belongs to a different tenant ({})", R::NAME),
                        });
                    }
                }
            }
        }

        Ok(response)
    }
}
