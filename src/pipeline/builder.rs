//! Per-type pipeline construction and caching.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::cache::{CacheStore, FlightGroup};
use crate::detect::Capabilities;
use crate::notify::NotificationSink;
use crate::pipeline::behaviors::{
    AuditBehavior, AuthorizeBehavior, CacheBehavior, InvalidateBehavior, NotifyBehavior,
    SoftDeleteBehavior, TenantBehavior, ValidationBehavior,
};
use crate::pipeline::{Behavior, Handler, Pipeline};
use crate::principal::TenantResolver;
use crate::request::Request;

/// Shared collaborators the builder wires into behaviors.
///
/// An absent collaborator omits the dependent behaviors from every chain,
/// exactly as an absent capability shape would.
#[derive(Default)]
pub(crate) struct BehaviorStack {
    pub(crate) tenants: Option<Arc<dyn TenantResolver>>,
    pub(crate) cache: Option<Arc<dyn CacheStore>>,
    pub(crate) notifications: Option<Arc<dyn NotificationSink>>,
    pub(crate) flight: Arc<FlightGroup>,
}

/// Lazily built, per-request-type pipelines, cached for the process
/// lifetime.
///
/// Construction is idempotent under concurrent first access: the first
/// finished build wins the slot, and a racing builder returns its own
/// equivalent chain with no observable difference.
pub struct Pipelines {
    built: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
    stack: BehaviorStack,
}

impl Pipelines {
    pub(crate) fn new(stack: BehaviorStack) -> Self {
        Self {
            built: RwLock::new(HashMap::new()),
            stack,
        }
    }

    /// Returns the pipeline for `R`, building it on first use.
    pub fn resolve<R: Request>(&self, terminal: &Arc<dyn Handler<R>>) -> Arc<Pipeline<R>> {
        let id = TypeId::of::<R>();

        if let Some(slot) = self.built.read().get(&id) {
            if let Ok(found) = slot.clone().downcast::<Pipeline<R>>() {
                return found;
            }
        }

        let assembled = Arc::new(self.assemble::<R>(terminal.clone()));
        let mut built = self.built.write();
        let slot = built
            .entry(id)
            .or_insert_with(|| assembled.clone() as Arc<dyn Any + Send + Sync>);
        slot.clone().downcast::<Pipeline<R>>().unwrap_or(assembled)
    }

    /// Number of request types with a built pipeline.
    pub fn built_count(&self) -> usize {
        self.built.read().len()
    }

    /// Assembles the ordered chain for `R` from its detected capabilities.
    ///
    /// Outer to inner: authorize, tenant, validation; then for commands the
    /// post-processing stages in unwind order soft-delete → audit →
    /// invalidate → notify (pushed outermost-first as notify, invalidate,
    /// audit, soft-delete); for reads the cache stage wrapping the handler.
    fn assemble<R: Request>(&self, terminal: Arc<dyn Handler<R>>) -> Pipeline<R> {
        let caps = Capabilities::of::<R>();
        let mut stages: Vec<Arc<dyn Behavior<R>>> = Vec::new();

        stages.push(Arc::new(AuthorizeBehavior));

        if caps.tenant_scoped {
            if let Some(resolver) = &self.stack.tenants {
                stages.push(Arc::new(TenantBehavior::new(resolver.clone())));
            }
        }

        stages.push(Arc::new(ValidationBehavior));

        if R::KIND.is_command() {
            if let Some(sink) = &self.stack.notifications {
                stages.push(Arc::new(NotifyBehavior::new(sink.clone())));
            }
            if caps.invalidating {
                if let Some(store) = &self.stack.cache {
                    stages.push(Arc::new(InvalidateBehavior::new(store.clone())));
                }
            }
            if caps.audited {
                stages.push(Arc::new(AuditBehavior));
            }
            if caps.soft_delete {
                stages.push(Arc::new(SoftDeleteBehavior));
            }
        } else if caps.cacheable {
            if let Some(store) = &self.stack.cache {
                stages.push(Arc::new(CacheBehavior::new(
                    store.clone(),
                    self.stack.flight.clone(),
                )));
            }
        }

        debug!(request = R::NAME, stages = stages.len(), "pipeline assembled");
        Pipeline::new(stages, terminal)
    }
}

impl std::fmt::Debug for Pipelines {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipelines")
            .field("built", &self.built_count())
            .finish_non_exhaustive()
    }
}
