//! HTTP host exposing a [`Mediator`] to remote dispatchers.
//!
//! Each exposed request type gets a route closure keyed by its wire
//! discriminator. The closure decodes the envelope body into the concrete
//! type, runs the local mediator, and re-encodes the response, so the host
//! itself stays untyped.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use futures_util::future::BoxFuture;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use super::local::Mediator;
use super::wire::{Envelope, Problem, Reply};
use super::{Dispatch, DispatchError, DispatchResult};
use crate::pipeline::PipelineError;
use crate::principal::Principal;
use crate::request::Request;

type Route = Arc<
    dyn Fn(
            Arc<Mediator>,
            Option<Principal>,
            serde_json::Value,
        ) -> BoxFuture<'static, DispatchResult<serde_json::Value>>
        + Send
        + Sync,
>;

/// Server side of remote dispatch: routes envelopes to a local mediator.
#[derive(Clone)]
pub struct RemoteHost {
    mediator: Arc<Mediator>,
    routes: HashMap<&'static str, Route>,
}

impl RemoteHost {
    /// Wraps a mediator; no request types are exposed yet.
    pub fn new(mediator: Arc<Mediator>) -> Self {
        Self {
            mediator,
            routes: HashMap::new(),
        }
    }

    /// Exposes `R` over the wire. Unexposed types are rejected with an
    /// unknown-kind problem even if the mediator could handle them.
    pub fn expose<R: Request>(mut self) -> Self {
        let route: Route = Arc::new(|mediator, principal, body| {
            Box::pin(async move {
                let request: R = serde_json::from_value(body)?;
                let response = mediator.send(principal, request).await?;
                Ok(serde_json::to_value(response)?)
            })
        });
        self.routes.insert(R::NAME, route);
        self
    }

    /// Number of exposed request types.
    pub fn exposed_count(&self) -> usize {
        self.routes.len()
    }

    async fn handle(&self, envelope: Envelope) -> DispatchResult<Reply> {
        let route = self
            .routes
            .get(envelope.kind.as_str())
            .ok_or_else(|| DispatchError::UnknownKind {
                kind: envelope.kind.clone(),
            })?;

        debug!(kind = %envelope.kind, correlation = %envelope.id, "handling envelope");
        let body = route(self.mediator.clone(), envelope.principal, envelope.body).await?;
        Ok(Reply {
            id: envelope.id,
            body,
        })
    }

    /// Builds the axum router: `POST /dispatch` plus a liveness probe.
    pub fn router(self) -> axum::Router {
        axum::Router::new()
            .route("/dispatch", post(dispatch))
            .route("/healthz", get(healthz))
            .layer(TraceLayer::new_for_http())
            .with_state(Arc::new(self))
    }
}

impl std::fmt::Debug for RemoteHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteHost")
            .field("exposed", &self.routes.len())
            .finish_non_exhaustive()
    }
}

async fn dispatch(
    State(host): State<Arc<RemoteHost>>,
    Json(envelope): Json<Envelope>,
) -> Result<Json<Reply>, HostError> {
    let reply = host.handle(envelope).await?;
    Ok(Json(reply))
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Maps dispatch failures onto HTTP problem responses.
#[derive(Debug)]
struct HostError(DispatchError);

impl From<DispatchError> for HostError {
    fn from(err: DispatchError) -> Self {
        Self(err)
    }
}

impl IntoResponse for HostError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            DispatchError::Pipeline(PipelineError::Validation(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            DispatchError::Pipeline(PipelineError::AccessDenied { .. }) => StatusCode::FORBIDDEN,
            // Client-closed-request; not in the StatusCode constants.
            DispatchError::Pipeline(PipelineError::Cancelled) => {
                StatusCode::from_u16(499).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            DispatchError::Pipeline(PipelineError::Unhandled { .. })
            | DispatchError::UnknownKind { .. }
            | DispatchError::Codec(_) => StatusCode::BAD_REQUEST,
            DispatchError::Pipeline(PipelineError::Handler(_))
            | DispatchError::Remote { .. }
            | DispatchError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            warn!(error = %self.0, "dispatch failed");
        } else {
            debug!(error = %self.0, "dispatch rejected");
        }

        let problem = Problem {
            error: self.0.to_string(),
            code: status.as_u16(),
        };
        (status, Json(problem)).into_response()
    }
}
