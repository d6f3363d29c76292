//! In-process dispatcher.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{Dispatch, DispatchError, DispatchResult};
use crate::cache::CacheStore;
use crate::notify::NotificationSink;
use crate::pipeline::builder::BehaviorStack;
use crate::pipeline::{Execution, Handler, PipelineError, Pipelines};
use crate::principal::{Principal, TenantResolver};
use crate::request::Request;

struct Registered<R: Request> {
    terminal: Arc<dyn Handler<R>>,
}

/// Local dispatcher: runs the behavior chain in-process.
///
/// Adds no caching layer of its own — caching is entirely the pipeline's
/// responsibility — and performs no error translation: handler and behavior
/// errors propagate as-is.
pub struct Mediator {
    handlers: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    pipelines: Pipelines,
}

impl Mediator {
    /// Starts assembling a mediator.
    pub fn builder() -> MediatorBuilder {
        MediatorBuilder::default()
    }

    /// Built pipelines so far (grows lazily, one per dispatched type).
    pub fn pipelines(&self) -> &Pipelines {
        &self.pipelines
    }

    fn registered<R: Request>(&self) -> DispatchResult<Arc<dyn Handler<R>>> {
        self.handlers
            .get(&TypeId::of::<R>())
            .and_then(|slot| slot.clone().downcast::<Registered<R>>().ok())
            .map(|slot| slot.terminal.clone())
            .ok_or(DispatchError::Pipeline(PipelineError::Unhandled {
                name: R::NAME,
            }))
    }
}

impl std::fmt::Debug for Mediator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mediator")
            .field("handlers", &self.handlers.len())
            .field("pipelines", &self.pipelines)
            .finish()
    }
}

#[async_trait]
impl Dispatch for Mediator {
    async fn send_with<R: Request>(
        &self,
        principal: Option<Principal>,
        request: R,
        cancel: CancellationToken,
    ) -> DispatchResult<Option<R::Response>> {
        let terminal = self.registered::<R>()?;
        let pipeline = self.pipelines.resolve::<R>(&terminal);

        let mut ctx = Execution::with_cancellation(principal, cancel);
        debug!(request = R::NAME, correlation = %ctx.correlation(), "dispatching locally");
        Ok(pipeline.run(&mut ctx, &request).await?)
    }
}

/// Assembles a [`Mediator`]: collaborators first, then handler
/// registrations.
#[derive(Default)]
pub struct MediatorBuilder {
    handlers: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    stack: BehaviorStack,
}

impl MediatorBuilder {
    /// Registers the terminal handler for `R`. A later registration for the
    /// same type replaces the earlier one.
    pub fn register<R, H>(mut self, handler: H) -> Self
    where
        R: Request,
        H: Handler<R>,
    {
        self.register_arc::<R>(Arc::new(handler));
        self
    }

    /// Registers an already-shared handler.
    pub fn register_shared<R: Request>(mut self, handler: Arc<dyn Handler<R>>) -> Self {
        self.register_arc::<R>(handler);
        self
    }

    fn register_arc<R: Request>(&mut self, terminal: Arc<dyn Handler<R>>) {
        self.handlers
            .insert(TypeId::of::<R>(), Arc::new(Registered::<R> { terminal }));
    }

    /// Configures the cache store used by the cache and invalidation
    /// behaviors. Without one, those behaviors are omitted from every chain.
    pub fn cache(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.stack.cache = Some(store);
        self
    }

    /// Configures the tenant resolver. Without one, tenant behaviors are
    /// omitted even for tenant-scoped entities.
    pub fn tenants(mut self, resolver: Arc<dyn TenantResolver>) -> Self {
        self.stack.tenants = Some(resolver);
        self
    }

    /// Configures the change-notification sink.
    pub fn notifications(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.stack.notifications = Some(sink);
        self
    }

    /// Finishes assembly.
    pub fn build(self) -> Mediator {
        Mediator {
            handlers: self.handlers,
            pipelines: Pipelines::new(self.stack),
        }
    }
}

impl std::fmt::Debug for MediatorBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediatorBuilder")
            .field("handlers", &self.handlers.len())
            .finish_non_exhaustive()
    }
}
