//! Transport-agnostic dispatch.
//!
//! One contract, two implementations: [`Mediator`] runs the pipeline
//! in-process; [`RemoteDispatcher`] ships the request across a boundary and
//! replicates the caching contract client-side. Calling code stays generic
//! over [`Dispatch`].

pub mod host;
pub mod local;
pub mod remote;
pub mod wire;

pub use host::RemoteHost;
pub use local::{Mediator, MediatorBuilder};
pub use remote::RemoteDispatcher;
pub use wire::{Envelope, Problem, Reply};

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::pipeline::PipelineError;
use crate::principal::Principal;
use crate::request::Request;

/// Errors surfaced to dispatching callers.
///
/// A decoded application error ([`DispatchError::Remote`], status preserved)
/// is deliberately distinct from a transport-level failure
/// ([`DispatchError::Transport`]: connection refused, timeout, malformed
/// body).
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Pipeline execution failed (local, or server-side surfaced remotely).
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// The remote side returned a decoded problem payload.
    #[error("remote rejected request ({status}): {message}")]
    Remote {
        /// Status code supplied by the remote side.
        status: u16,
        /// Problem description.
        message: String,
    },

    /// The transport itself failed.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// Request or response payload could not be encoded/decoded.
    #[error("payload codec failure: {0}")]
    Codec(#[from] serde_json::Error),

    /// The host has no route for the envelope's discriminator.
    #[error("unknown request kind: {kind}")]
    UnknownKind {
        /// The unresolvable discriminator.
        kind: String,
    },
}

/// Convenience result type for dispatch.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Caller-facing entry point routing a request to its pipeline, locally or
/// remotely.
#[async_trait]
pub trait Dispatch: Send + Sync {
    /// Sends a request with a fresh cancellation token.
    async fn send<R: Request>(
        &self,
        principal: Option<Principal>,
        request: R,
    ) -> DispatchResult<Option<R::Response>> {
        self.send_with(principal, request, CancellationToken::new())
            .await
    }

    /// Sends a request observing a caller-owned cancellation token.
    async fn send_with<R: Request>(
        &self,
        principal: Option<Principal>,
        request: R,
        cancel: CancellationToken,
    ) -> DispatchResult<Option<R::Response>>;
}
