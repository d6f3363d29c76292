//! Wire format shared by the remote dispatcher and host.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::principal::Principal;
use crate::request::Request;

/// Serialized request plus the type discriminator the host needs to
/// reconstruct the concrete request type before decoding the body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Correlation id, echoed in the reply.
    pub id: Uuid,
    /// Request type discriminator ([`Request::NAME`]).
    pub kind: String,
    /// Principal injected at the transport boundary.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub principal: Option<Principal>,
    /// Serialized request body.
    pub body: serde_json::Value,
}

impl Envelope {
    /// Wraps a request for transport.
    pub fn new<R: Request>(
        principal: Option<Principal>,
        request: &R,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: Uuid::new_v4(),
            kind: R::NAME.to_string(),
            principal,
            body: serde_json::to_value(request)?,
        })
    }
}

/// Successful reply: the serialized `Option<Response>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    /// Correlation id from the envelope.
    pub id: Uuid,
    /// Serialized response; JSON `null` means "not found".
    pub body: serde_json::Value,
}

/// Structured problem description for failed dispatches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    /// Human-readable error.
    pub error: String,
    /// HTTP-style status code.
    pub code: u16,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Entity, RequestKind};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Probe {
        id: u64,
    }

    impl Entity for Probe {}

    impl Request for Probe {
        type Response = Probe;
        const NAME: &'static str = "probe";
        const KIND: RequestKind = RequestKind::Query;
    }

    #[test]
    fn test_envelope_carries_discriminator() {
        let envelope = Envelope::new(None, &Probe { id: 7 }).unwrap();
        assert_eq!(envelope.kind, "probe");
        assert_eq!(envelope.body["id"], 7);

        let encoded = serde_json::to_string(&envelope).unwrap();
        assert!(!encoded.contains("principal"));

        let decoded: Envelope = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.id, envelope.id);
        assert!(decoded.principal.is_none());
    }
}
