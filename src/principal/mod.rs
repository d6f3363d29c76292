//! Security principal and tenant resolution.
//!
//! The pipeline never persists a principal; it is carried on the execution
//! context, read by the authorization and tenant behaviors, and injected at
//! the transport boundary by the remote dispatcher.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::keys;

/// An already-resolved security principal.
///
/// Identity issuance is out of scope; callers construct this from whatever
/// authentication layer they run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Stable subject identifier.
    pub subject: String,
    /// Granted scopes, checked by the authorization behavior.
    pub scopes: Vec<String>,
    /// Opaque tenant claim, consumed by a [`TenantResolver`].
    pub tenant_claim: Option<String>,
}

impl Principal {
    /// Creates a principal with no scopes and no tenant claim.
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            scopes: Vec::new(),
            tenant_claim: None,
        }
    }

    /// Adds a scope.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scopes.push(scope.into());
        self
    }

    /// Sets the tenant claim.
    pub fn with_tenant(mut self, claim: impl Into<String>) -> Self {
        self.tenant_claim = Some(claim.into());
        self
    }

    /// Returns `true` if the principal carries the given scope.
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}

/// Errors raised while resolving a tenant from a principal.
///
/// The tenant behavior surfaces every variant as an authorization failure;
/// resolution never falls back to a silent default.
#[derive(Debug, Error)]
pub enum TenantError {
    /// The principal has no tenant claim to resolve.
    #[error("principal has no tenant claim")]
    MissingClaim,

    /// The claim does not map to a known tenant.
    #[error("unknown tenant claim: {claim}")]
    Unknown {
        /// The unresolvable claim.
        claim: String,
    },

    /// The backing directory could not be reached.
    #[error("tenant directory unavailable: {reason}")]
    Unavailable {
        /// Error message.
        reason: String,
    },
}

/// Maps a principal to a tenant identifier.
#[async_trait]
pub trait TenantResolver: Send + Sync + 'static {
    /// Resolves the tenant for `principal`, or fails.
    async fn resolve(&self, principal: &Principal) -> Result<u64, TenantError>;
}

/// Resolver that derives the tenant id as a digest of the claim itself.
///
/// Keeps server-side cache key scopes consistent with the claim digests the
/// remote dispatcher computes client-side.
#[derive(Debug, Default, Clone, Copy)]
pub struct DigestTenantResolver;

#[async_trait]
impl TenantResolver for DigestTenantResolver {
    async fn resolve(&self, principal: &Principal) -> Result<u64, TenantError> {
        match principal.tenant_claim.as_deref() {
            Some(claim) => Ok(keys::tenant_digest(claim)),
            None => Err(TenantError::MissingClaim),
        }
    }
}

/// In-memory claim → tenant directory for tests.
#[cfg(any(test, feature = "mock"))]
#[derive(Debug, Default)]
pub struct MockTenantDirectory {
    entries: parking_lot::Mutex<std::collections::HashMap<String, u64>>,
}

#[cfg(any(test, feature = "mock"))]
impl MockTenantDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a claim → tenant mapping.
    pub fn insert(&self, claim: impl Into<String>, tenant: u64) {
        self.entries.lock().insert(claim.into(), tenant);
    }
}

#[cfg(any(test, feature = "mock"))]
#[async_trait]
impl TenantResolver for MockTenantDirectory {
    async fn resolve(&self, principal: &Principal) -> Result<u64, TenantError> {
        let claim = principal
            .tenant_claim
            .as_deref()
            .ok_or(TenantError::MissingClaim)?;
        self.entries
            .lock()
            .get(claim)
            .copied()
            .ok_or_else(|| TenantError::Unknown {
                claim: claim.to_string(),
            })
    }
}
