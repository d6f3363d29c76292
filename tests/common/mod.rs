//! Shared order-domain fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use trellis::cache::Expiration;
use trellis::keys::KeyScope;
use trellis::pipeline::{Execution, Handler};
use trellis::request::{Entity, Operation, Request, RequestKind, ValidationFailures};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub tenant: u64,
    pub total_cents: u64,
    pub deleted: bool,
    pub updated_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity for Order {
    const TENANT_SCOPED: bool = true;
    const SOFT_DELETE: bool = true;
    const AUDITED: bool = true;

    fn entity_name() -> &'static str {
        "order"
    }

    fn tenant_id(&self) -> Option<u64> {
        Some(self.tenant)
    }

    fn is_deleted(&self) -> bool {
        self.deleted
    }

    fn set_deleted(&mut self, deleted: bool) {
        self.deleted = deleted;
    }

    fn stamp(&mut self, actor: Option<&str>, at: DateTime<Utc>) {
        self.updated_by = actor.map(str::to_string);
        self.updated_at = Some(at);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetOrder {
    pub id: u64,
}

impl Request for GetOrder {
    type Response = Order;
    const NAME: &'static str = "order.get";
    const KIND: RequestKind = RequestKind::Query;
    const CACHEABLE: bool = true;

    fn validate(&self) -> Result<(), ValidationFailures> {
        if self.id == 0 {
            return Err(ValidationFailures::single("id", "must be nonzero"));
        }
        Ok(())
    }

    fn cache_key(&self, scope: &KeyScope) -> String {
        format!("Order:{}:Tenant:{}", self.id, scope.tenant_or_zero())
    }

    fn cache_tag(&self) -> Option<String> {
        Some("Orders".to_string())
    }

    fn expiry(&self) -> Option<Expiration> {
        Some(Expiration::absolute(Duration::from_secs(3600)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateOrder {
    pub id: u64,
    pub total_cents: u64,
}

impl Request for UpdateOrder {
    type Response = Order;
    const NAME: &'static str = "order.update";
    const KIND: RequestKind = RequestKind::Command(Operation::Update);
    const INVALIDATES: bool = true;

    fn required_scope(&self) -> Option<&str> {
        Some("orders:write")
    }

    fn invalidation_tag(&self) -> Option<String> {
        Some("Orders".to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteOrder {
    pub id: u64,
}

impl Request for DeleteOrder {
    type Response = Order;
    const NAME: &'static str = "order.delete";
    const KIND: RequestKind = RequestKind::Command(Operation::Delete);
    const INVALIDATES: bool = true;

    fn required_scope(&self) -> Option<&str> {
        Some("orders:write")
    }

    fn invalidation_tag(&self) -> Option<String> {
        Some("Orders".to_string())
    }
}

/// In-memory order store shared by the handlers, with call counters so tests
/// can observe how often the pipeline actually reached the data layer.
pub struct OrderRepo {
    orders: Mutex<HashMap<u64, Order>>,
    get_calls: AtomicUsize,
    handler_delay: Option<Duration>,
}

impl OrderRepo {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            orders: Mutex::new(HashMap::new()),
            get_calls: AtomicUsize::new(0),
            handler_delay: None,
        })
    }

    /// Widens the read window so concurrent-miss tests can overlap reliably.
    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            orders: Mutex::new(HashMap::new()),
            get_calls: AtomicUsize::new(0),
            handler_delay: Some(delay),
        })
    }

    pub fn seed(&self, order: Order) {
        self.orders.lock().insert(order.id, order);
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn stored(&self, id: u64) -> Option<Order> {
        self.orders.lock().get(&id).cloned()
    }
}

pub struct OrderHandler {
    pub repo: Arc<OrderRepo>,
}

impl OrderHandler {
    pub fn new(repo: Arc<OrderRepo>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Handler<GetOrder> for OrderHandler {
    async fn handle(&self, _ctx: &Execution, request: &GetOrder) -> anyhow::Result<Option<Order>> {
        self.repo.get_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.repo.handler_delay {
            tokio::time::sleep(delay).await;
        }
        let order = self.repo.orders.lock().get(&request.id).cloned();
        // Soft-deleted rows are invisible to reads.
        Ok(order.filter(|o| !o.deleted))
    }
}

#[async_trait]
impl Handler<UpdateOrder> for OrderHandler {
    async fn handle(
        &self,
        _ctx: &Execution,
        request: &UpdateOrder,
    ) -> anyhow::Result<Option<Order>> {
        let mut orders = self.repo.orders.lock();
        match orders.get_mut(&request.id) {
            Some(order) => {
                order.total_cents = request.total_cents;
                Ok(Some(order.clone()))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl Handler<DeleteOrder> for OrderHandler {
    async fn handle(
        &self,
        ctx: &Execution,
        request: &DeleteOrder,
    ) -> anyhow::Result<Option<Order>> {
        let mut orders = self.repo.orders.lock();
        if ctx.soft_delete() {
            match orders.get_mut(&request.id) {
                Some(order) => {
                    order.deleted = true;
                    Ok(Some(order.clone()))
                }
                None => Ok(None),
            }
        } else {
            Ok(orders.remove(&request.id))
        }
    }
}

pub fn order(id: u64, tenant: u64, total_cents: u64) -> Order {
    Order {
        id,
        tenant,
        total_cents,
        deleted: false,
        updated_by: None,
        updated_at: None,
    }
}
