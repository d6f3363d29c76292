//! Request and entity contracts.
//!
//! A [`Request`] is an immutable, typed description of one command or query.
//! Capability gates are associated consts so the pipeline builder can decide
//! behavior inclusion once per type, at construction, with zero per-call
//! cost; per-call directives (cache key, expiration, invalidation tag) are
//! methods over the request value.

pub mod validate;

pub use validate::{FieldFailure, ValidationFailures};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::cache::Expiration;
use crate::keys::KeyScope;

/// Mutation category carried by command requests and change notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Creates an entity.
    Create,
    /// Updates an entity.
    Update,
    /// Deletes (or soft-deletes) an entity.
    Delete,
    /// Any other state change.
    Other,
}

/// Static shape of a request type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Identified read of a single result.
    Query,
    /// List/search read; the tenant behavior injects a filter instead of
    /// validating a single owner.
    Search,
    /// State mutation.
    Command(Operation),
}

impl RequestKind {
    /// Returns `true` for mutations.
    pub fn is_command(&self) -> bool {
        matches!(self, RequestKind::Command(_))
    }

    /// Mutation category, if this is a command.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            RequestKind::Command(operation) => Some(*operation),
            _ => None,
        }
    }
}

/// A typed description of one command or query.
///
/// Defaults describe the least capable request: no auth scope, no rules, no
/// caching, no invalidation. Types opt in by overriding the consts and the
/// matching methods together.
pub trait Request: Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Response payload; `None` at the pipeline level means "not found".
    type Response: Entity + Clone + Serialize + DeserializeOwned;

    /// Wire discriminator; the remote host reconstructs the concrete type
    /// from this name before deserializing the body.
    const NAME: &'static str;

    /// Query/search/command shape.
    const KIND: RequestKind;

    /// Whether query results may be cached. Gate only; each call still
    /// opts in by returning an expiration from [`Request::expiry`].
    const CACHEABLE: bool = false;

    /// Whether a successful command sweeps a cache tag.
    const INVALIDATES: bool = false;

    /// Scope the principal must carry, or `None` for anonymous access.
    fn required_scope(&self) -> Option<&str> {
        None
    }

    /// Entity-level rules, checked before [`Request::validate`].
    fn validate_entity(&self) -> Result<(), ValidationFailures> {
        Ok(())
    }

    /// Whole-request rules.
    fn validate(&self) -> Result<(), ValidationFailures> {
        Ok(())
    }

    /// Deterministic cache key for this request under `scope`. Two
    /// logically identical requests must produce the same key; any
    /// parameter that affects the result must feed into it.
    fn cache_key(&self, _scope: &KeyScope) -> String {
        String::new()
    }

    /// Coarse tag grouping this entry with others for bulk invalidation.
    fn cache_tag(&self) -> Option<String> {
        None
    }

    /// Expiration policy for this call. `None` skips caching entirely.
    fn expiry(&self) -> Option<Expiration> {
        None
    }

    /// Tag swept after this command succeeds.
    fn invalidation_tag(&self) -> Option<String> {
        None
    }
}

/// Capability shape of a response/entity type.
///
/// Consts advertise which optional behaviors apply; the accessors are only
/// called when the matching const is `true`, so the defaults are inert.
pub trait Entity: Send + Sync + 'static {
    /// Entity carries a tenant identifier.
    const TENANT_SCOPED: bool = false;

    /// Entity carries a soft-delete marker.
    const SOFT_DELETE: bool = false;

    /// Entity carries audit metadata.
    const AUDITED: bool = false;

    /// Label used in change notices.
    fn entity_name() -> &'static str
    where
        Self: Sized,
    {
        std::any::type_name::<Self>()
    }

    /// Owning tenant, when [`Entity::TENANT_SCOPED`].
    fn tenant_id(&self) -> Option<u64> {
        None
    }

    /// Soft-delete marker, when [`Entity::SOFT_DELETE`].
    fn is_deleted(&self) -> bool {
        false
    }

    /// Sets the soft-delete marker.
    fn set_deleted(&mut self, _deleted: bool) {}

    /// Populates audit metadata, when [`Entity::AUDITED`].
    fn stamp(&mut self, _actor: Option<&str>, _at: DateTime<Utc>) {}
}

impl Entity for () {
    fn entity_name() -> &'static str {
        "unit"
    }
}
