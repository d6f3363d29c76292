//! Capability detection.
//!
//! The pipeline builder asks this module, once per request type, which
//! optional behaviors apply. Detection reads the associated consts that
//! [`Request`] and [`Entity`] types declare, so it is resolved at
//! monomorphization: a pure function of the static types, never of a
//! request's runtime value, with no per-call cost.

use crate::request::{Entity, Operation, Request};

/// Which optional behaviors a request/response type pair activates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Query results may be cached.
    pub cacheable: bool,
    /// Successful completion sweeps a cache tag.
    pub invalidating: bool,
    /// The response entity is tenant-owned.
    pub tenant_scoped: bool,
    /// Delete commands mark instead of removing.
    pub soft_delete: bool,
    /// Mutations stamp audit metadata.
    pub audited: bool,
}

impl Capabilities {
    /// No optional behaviors.
    pub fn none() -> Self {
        Self::default()
    }

    /// Detects the capabilities of `R`.
    ///
    /// Caching applies to reads only and invalidation to commands only, so a
    /// mis-declared gate (for example `CACHEABLE` on a command) is dropped
    /// here rather than producing a nonsensical chain.
    pub fn of<R: Request>() -> Self {
        let kind = R::KIND;
        Self {
            cacheable: R::CACHEABLE && !kind.is_command(),
            invalidating: R::INVALIDATES && kind.is_command(),
            tenant_scoped: <R::Response as Entity>::TENANT_SCOPED,
            soft_delete: kind.operation() == Some(Operation::Delete)
                && <R::Response as Entity>::SOFT_DELETE,
            audited: kind.is_command() && <R::Response as Entity>::AUDITED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RequestKind;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Widget {
        id: u64,
        tenant: u64,
        deleted: bool,
    }

    impl Entity for Widget {
        const TENANT_SCOPED: bool = true;
        const SOFT_DELETE: bool = true;

        fn tenant_id(&self) -> Option<u64> {
            Some(self.tenant)
        }

        fn is_deleted(&self) -> bool {
            self.deleted
        }

        fn set_deleted(&mut self, deleted: bool) {
            self.deleted = deleted;
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Plain {
        id: u64,
    }

    impl Entity for Plain {}

    #[derive(Debug, Serialize, Deserialize)]
    struct GetWidget {
        id: u64,
    }

    impl Request for GetWidget {
        type Response = Widget;
        const NAME: &'static str = "widget.get";
        const KIND: RequestKind = RequestKind::Query;
        const CACHEABLE: bool = true;
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct DeleteWidget {
        id: u64,
    }

    impl Request for DeleteWidget {
        type Response = Widget;
        const NAME: &'static str = "widget.delete";
        const KIND: RequestKind = RequestKind::Command(Operation::Delete);
        const INVALIDATES: bool = true;
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct DeletePlain {
        id: u64,
    }

    impl Request for DeletePlain {
        type Response = Plain;
        const NAME: &'static str = "plain.delete";
        const KIND: RequestKind = RequestKind::Command(Operation::Delete);
    }

    #[test]
    fn test_query_capabilities() {
        let caps = Capabilities::of::<GetWidget>();
        assert!(caps.cacheable);
        assert!(caps.tenant_scoped);
        assert!(!caps.invalidating);
        assert!(!caps.soft_delete);
        assert!(!caps.audited);
    }

    #[test]
    fn test_delete_command_capabilities() {
        let caps = Capabilities::of::<DeleteWidget>();
        assert!(!caps.cacheable);
        assert!(caps.invalidating);
        assert!(caps.soft_delete);
    }

    #[test]
    fn test_shape_absence_omits_capability() {
        let caps = Capabilities::of::<DeletePlain>();
        assert!(!caps.soft_delete);
        assert!(!caps.tenant_scoped);
    }

    #[test]
    fn test_detection_is_deterministic() {
        assert_eq!(
            Capabilities::of::<GetWidget>(),
            Capabilities::of::<GetWidget>()
        );
    }
}
