//! Behavior chain execution.
//!
//! A pipeline is a fixed, ordered list of behaviors terminated by exactly one
//! handler. Each behavior receives the execution context, the request, and a
//! [`Next`] continuation representing the rest of the chain. `Next` is
//! consumed by value, so a behavior can run the continuation at most once;
//! not running it at all is a short-circuit.

pub mod behaviors;
pub mod builder;


pub use builder::Pipelines;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::keys::{self, KeyScope};
use crate::principal::Principal;
use crate::request::{Request, ValidationFailures};

/// Errors surfaced by pipeline execution.
///
/// Behaviors either pass an error through unmodified or translate it into a
/// more specific variant; they never swallow one. Callers always receive
/// either a response (possibly `None`, meaning "not found") or exactly one
/// of these.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Declared rules failed; the handler never ran.
    #[error("validation failed: {0}")]
    Validation(ValidationFailures),

    /// Authorization or tenant check failed; the handler never ran.
    #[error("access denied: {reason}")]
    AccessDenied {
        /// Denial reason.
        reason: String,
    },

    /// The request's cancellation signal fired.
    #[error("request cancelled")]
    Cancelled,

    /// The terminal handler (or its data access) failed.
    #[error("handler failed: {0}")]
    Handler(#[from] anyhow::Error),

    /// No handler is registered for the request type.
    #[error("no handler registered for {name}")]
    Unhandled {
        /// Request type discriminator.
        name: &'static str,
    },
}

/// Convenience result type for pipeline execution.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Per-call execution state.
///
/// Carries the principal and cancellation signal in, and the cross-cutting
/// flags behaviors hand to the terminal handler (resolved tenant, injected
/// tenant filter, soft-delete mode). The request itself is never mutated.
#[derive(Debug)]
pub struct Execution {
    principal: Option<Principal>,
    activated_at: DateTime<Utc>,
    correlation: Uuid,
    cancel: CancellationToken,
    tenant: Option<u64>,
    tenant_filter: Option<u64>,
    soft_delete: bool,
}

impl Execution {
    /// Starts an execution with a fresh cancellation token.
    pub fn new(principal: Option<Principal>) -> Self {
        Self::with_cancellation(principal, CancellationToken::new())
    }

    /// Starts an execution observing a caller-owned cancellation token.
    pub fn with_cancellation(principal: Option<Principal>, cancel: CancellationToken) -> Self {
        Self {
            principal,
            activated_at: Utc::now(),
            correlation: Uuid::new_v4(),
            cancel,
            tenant: None,
            tenant_filter: None,
            soft_delete: false,
        }
    }

    /// The acting principal, if authenticated.
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// When the request entered the pipeline.
    pub fn activated_at(&self) -> DateTime<Utc> {
        self.activated_at
    }

    /// Correlation id for logs and wire envelopes.
    pub fn correlation(&self) -> Uuid {
        self.correlation
    }

    /// The cancellation signal for this call.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Tenant resolved by the tenant behavior, when present.
    pub fn tenant(&self) -> Option<u64> {
        self.tenant
    }

    /// Tenant filter injected for list/search reads; handlers must apply it.
    pub fn tenant_filter(&self) -> Option<u64> {
        self.tenant_filter
    }

    /// `true` when a delete handler must mark instead of remove.
    pub fn soft_delete(&self) -> bool {
        self.soft_delete
    }

    /// Errors out promptly if the call was cancelled.
    pub fn ensure_live(&self) -> PipelineResult<()> {
        if self.cancel.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Cache key scope for this call: the resolved tenant when the tenant
    /// behavior ran, otherwise a digest of the principal's claim.
    pub fn key_scope(&self) -> KeyScope {
        let tenant = self.tenant.or_else(|| {
            self.principal
                .as_ref()
                .and_then(|p| p.tenant_claim.as_deref())
                .map(keys::tenant_digest)
        });
        let principal = self
            .principal
            .as_ref()
            .map(|p| keys::subject_digest(&p.subject));
        KeyScope { tenant, principal }
    }

    pub(crate) fn set_tenant(&mut self, tenant: u64) {
        self.tenant = Some(tenant);
    }

    pub(crate) fn set_tenant_filter(&mut self, tenant: u64) {
        self.tenant_filter = Some(tenant);
    }

    pub(crate) fn set_soft_delete(&mut self, soft_delete: bool) {
        self.soft_delete = soft_delete;
    }
}

/// Terminal business logic for exactly one request type.
///
/// Failures are carried as [`anyhow::Error`] and propagate through every
/// outer behavior untouched; the pipeline performs no retries.
#[async_trait]
pub trait Handler<R: Request>: Send + Sync + 'static {
    /// Executes the request. `Ok(None)` means "not found".
    async fn handle(&self, ctx: &Execution, request: &R) -> anyhow::Result<Option<R::Response>>;
}

/// A unit of cross-cutting logic wrapping the continuation to the rest of
/// the chain.
#[async_trait]
pub trait Behavior<R: Request>: Send + Sync + 'static {
    /// Runs this stage. Call `next.run(..)` zero or one times.
    async fn handle(
        &self,
        ctx: &mut Execution,
        request: &R,
        next: Next<'_, R>,
    ) -> PipelineResult<Option<R::Response>>;
}

/// The rest of the chain: remaining behaviors plus the terminal handler.
pub struct Next<'a, R: Request> {
    stages: &'a [Arc<dyn Behavior<R>>],
    terminal: &'a dyn Handler<R>,
}

impl<'a, R: Request> Next<'a, R> {
    /// Invokes the next stage, or the handler if none remain.
    pub async fn run(
        self,
        ctx: &mut Execution,
        request: &R,
    ) -> PipelineResult<Option<R::Response>> {
        ctx.ensure_live()?;
        match self.stages.split_first() {
            Some((stage, rest)) => {
                let next = Next {
                    stages: rest,
                    terminal: self.terminal,
                };
                stage.handle(ctx, request, next).await
            }
            None => self
                .terminal
                .handle(ctx, request)
                .await
                .map_err(PipelineError::from),
        }
    }
}

/// The fixed, ordered chain for one request type.
pub struct Pipeline<R: Request> {
    stages: Vec<Arc<dyn Behavior<R>>>,
    terminal: Arc<dyn Handler<R>>,
}

impl<R: Request> Pipeline<R> {
    pub(crate) fn new(stages: Vec<Arc<dyn Behavior<R>>>, terminal: Arc<dyn Handler<R>>) -> Self {
        Self { stages, terminal }
    }

    /// Number of behaviors ahead of the handler.
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Runs the full chain for one request.
    pub async fn run(
        &self,
        ctx: &mut Execution,
        request: &R,
    ) -> PipelineResult<Option<R::Response>> {
        let next = Next {
            stages: &self.stages,
            terminal: &*self.terminal,
        };
        next.run(ctx, request).await
    }
}

impl<R: Request> std::fmt::Debug for Pipeline<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages.len())
            .finish_non_exhaustive()
    }
}
