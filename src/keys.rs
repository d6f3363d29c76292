//! Cache key scope digests.
//!
//! Cache keys must be stable per (request type, parameters, principal scope).
//! The scope part is derived here: BLAKE3 digests of the tenant claim and the
//! principal subject, truncated to 64 bits. Truncation is acceptable for key
//! scoping: a collision produces a cache miss (or an entry another scope
//! cannot decode into its response type), never data corruption, and nothing
//! cryptographic depends on it.

use crate::principal::Principal;

/// Computes a 64-bit BLAKE3 digest of arbitrary bytes.
#[inline]
pub fn digest64(data: &[u8]) -> u64 {
    let hash = blake3::hash(data);
    let bytes: [u8; 8] = hash.as_bytes()[0..8]
        .try_into()
        .expect("BLAKE3 always produces at least 8 bytes");
    u64::from_le_bytes(bytes)
}

/// Digest of a tenant claim string.
#[inline]
pub fn tenant_digest(claim: &str) -> u64 {
    digest64(claim.as_bytes())
}

/// Digest of a principal subject.
#[inline]
pub fn subject_digest(subject: &str) -> u64 {
    digest64(subject.as_bytes())
}

/// The principal-derived part of a cache key.
///
/// Two logically identical requests must produce the same scope; requests
/// issued under different tenants or subjects must not share entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyScope {
    /// Resolved (or claim-derived) tenant identifier.
    pub tenant: Option<u64>,
    /// Digest of the principal subject.
    pub principal: Option<u64>,
}

impl KeyScope {
    /// Scope for unauthenticated requests.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Scope pinned to a resolved tenant.
    pub fn for_tenant(tenant: u64) -> Self {
        Self {
            tenant: Some(tenant),
            principal: None,
        }
    }

    /// Derives a scope from an (optional) principal, hashing the tenant
    /// claim and subject. Used by the remote dispatcher, which has no
    /// resolved tenant of its own.
    pub fn from_principal(principal: Option<&Principal>) -> Self {
        Self {
            tenant: principal
                .and_then(|p| p.tenant_claim.as_deref())
                .map(tenant_digest),
            principal: principal.map(|p| subject_digest(&p.subject)),
        }
    }

    /// Tenant component, or `0` for unscoped requests. Convenient for
    /// embedding in key templates.
    pub fn tenant_or_zero(&self) -> u64 {
        self.tenant.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_digest64_determinism() {
        let a = digest64(b"tenant-acme");
        let b = digest64(b"tenant-acme");
        assert_eq!(a, b);
    }

    #[test]
    fn test_digest64_uniqueness() {
        let inputs = ["tenant-acme", "tenant-acme ", "Tenant-acme", "tenant-acm"];
        let digests: HashSet<u64> = inputs.iter().map(|s| digest64(s.as_bytes())).collect();
        assert_eq!(digests.len(), inputs.len());
    }

    #[test]
    fn test_scope_from_principal() {
        let principal = Principal::new("alice").with_tenant("acme");
        let scope = KeyScope::from_principal(Some(&principal));

        assert_eq!(scope.tenant, Some(tenant_digest("acme")));
        assert_eq!(scope.principal, Some(subject_digest("alice")));

        let same = KeyScope::from_principal(Some(&principal));
        assert_eq!(scope, same);
    }

    #[test]
    fn test_anonymous_scope() {
        let scope = KeyScope::from_principal(None);
        assert_eq!(scope, KeyScope::anonymous());
        assert_eq!(scope.tenant_or_zero(), 0);
    }
}
