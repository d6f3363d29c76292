//! Trellis library crate (used by embedding applications and integration
//! tests).
//!
//! # Public API Surface
//!
//! The exports are organized by module:
//!
//! ## Core Types (Stable)
//! - [`Config`], [`ConfigError`] - Runtime configuration
//! - [`Request`], [`Entity`], [`RequestKind`], [`Operation`] - Request contract
//! - [`Handler`], [`Behavior`], [`Execution`], [`Pipeline`] - Behavior chains
//! - [`Dispatch`], [`Mediator`], [`RemoteDispatcher`], [`RemoteHost`] -
//!   Dispatch over one contract, in-process or across a boundary
//!
//! ## Caching
//! - [`CacheStore`], [`CacheEntry`], [`Expiration`] - Store contract
//! - [`LocalStore`], [`HttpCacheStore`], [`HybridCache`] - Tiers and the
//!   local-first combinator
//! - [`FlightGroup`] - Per-key single-flight latches
//!
//! ## Utilities
//! - [`KeyScope`] plus digest helpers for cache key scoping
//! - [`ChangeNotice`], [`NotificationSink`] - Post-commit change fan-out
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod cache;
pub mod config;
pub mod detect;
pub mod dispatch;
pub mod keys;
pub mod notify;
pub mod pipeline;
pub mod principal;
pub mod request;

pub use cache::{
    CacheEntry, CacheError, CacheResult, CacheStore, Expiration, FlightGroup, HttpCacheStore,
    HybridCache, LocalStore, store_from_config,
};
#[cfg(any(test, feature = "mock"))]
pub use cache::MemoryStore;

pub use config::{Config, ConfigError};
pub use detect::Capabilities;
pub use dispatch::{
    Dispatch, DispatchError, DispatchResult, Envelope, Mediator, MediatorBuilder, Problem,
    RemoteDispatcher, RemoteHost, Reply,
};
pub use keys::{KeyScope, digest64, subject_digest, tenant_digest};
pub use notify::{ChangeNotice, NotificationSink, NotifyError};
#[cfg(any(test, feature = "mock"))]
pub use notify::MockSink;
pub use pipeline::{
    Behavior, Execution, Handler, Next, Pipeline, PipelineError, PipelineResult, Pipelines,
};
pub use principal::{DigestTenantResolver, Principal, TenantError, TenantResolver};
#[cfg(any(test, feature = "mock"))]
pub use principal::MockTenantDirectory;
pub use request::{
    Entity, FieldFailure, Operation, Request, RequestKind, ValidationFailures,
};
