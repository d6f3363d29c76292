//! Built-in cross-cutting behaviors.
//!
//! Ordered by the builder as: authorize → tenant → validate → (command
//! post-processing: notify, invalidate, audit, soft-delete on the unwind) →
//! cache (queries, wrapping the handler) → handler.

mod audit;
mod authorize;
mod cache;
mod invalidate;
mod notify;
mod soft_delete;
mod tenant;
mod validate;

pub use audit::AuditBehavior;
pub use authorize::AuthorizeBehavior;
pub use cache::CacheBehavior;
pub use invalidate::InvalidateBehavior;
pub use notify::NotifyBehavior;
pub use soft_delete::SoftDeleteBehavior;
pub use tenant::TenantBehavior;
pub use validate::ValidationBehavior;
