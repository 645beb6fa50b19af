//! Filter subsystem.
//!
//! # Data Flow
//! ```text
//! FilterDefinition[] (per route, declaration order)
//!     → spec.rs (validated FilterSpec)
//!     → registry.rs (name → factory → Arc<dyn GatewayFilter>)
//!     → chain.rs (stages keyed by id, built once per table load)
//!
//! Per request (chain.rs::execute):
//!     pre hooks, in declaration order   ──► short-circuit or forward
//!     post hooks, reverse entry order   ◄── response or failure
//! ```
//!
//! # Design Decisions
//! - Enter/exit symmetry: a stage's post hook runs iff the stage was
//!   entered, exactly once, even when forwarding fails
//! - Post hooks see the final status or failure but only edit headers
//! - Filter options are parsed into typed structs at load time

pub mod builtin;
pub mod chain;
pub mod registry;
pub mod spec;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Response, StatusCode};

use crate::error::{BoxError, GatewayError};
use crate::proxy::{HeaderOverlay, RequestContext};

pub use chain::{execute, FilterChain};
pub use registry::{FilterFactory, FilterRegistry};
pub use spec::FilterSpec;

/// What the gateway does after a pre hook.
#[derive(Debug)]
pub enum FilterAction {
    /// Go on with the next stage (and eventually the upstream call).
    Continue,
    /// Skip the remaining pre hooks and the upstream call; reply with this.
    Respond(Response<Body>),
}

/// A unit of request/response processing attached to a route.
#[async_trait]
pub trait GatewayFilter: Send + Sync + std::fmt::Debug {
    /// Name used in logs and in `FilterError`.
    fn name(&self) -> &str;

    /// Runs before forwarding. May edit the upstream headers through
    /// `ctx.headers_mut()` or answer directly with `FilterAction::Respond`.
    async fn pre(&self, _ctx: &mut RequestContext) -> Result<FilterAction, BoxError> {
        Ok(FilterAction::Continue)
    }

    /// Runs after forwarding (or after a short-circuit).
    async fn post(&self, _ctx: &RequestContext, _response: &mut ResponseView<'_>) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Read-only view of a request's outcome plus a writable header overlay.
#[derive(Debug)]
pub struct ResponseView<'a> {
    status: Option<StatusCode>,
    headers: Option<&'a HeaderMap>,
    failure: Option<&'a GatewayError>,
    overlay: &'a mut HeaderOverlay,
}

impl<'a> ResponseView<'a> {
    pub(crate) fn new(
        outcome: &'a Result<Response<Body>, GatewayError>,
        overlay: &'a mut HeaderOverlay,
    ) -> Self {
        match outcome {
            Ok(response) => Self {
                status: Some(response.status()),
                headers: Some(response.headers()),
                failure: None,
                overlay,
            },
            Err(err) => Self {
                status: None,
                headers: None,
                failure: Some(err),
                overlay,
            },
        }
    }

    /// Status of the response, `None` if the request failed.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Status the client will see, failures included.
    pub fn effective_status(&self) -> StatusCode {
        match (self.status, self.failure) {
            (Some(status), _) => status,
            (None, Some(err)) => err.status(),
            (None, None) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn failure(&self) -> Option<&GatewayError> {
        self.failure
    }

    /// Response header with edits from earlier post hooks applied.
    pub fn header(&self, name: &HeaderName) -> Option<&HeaderValue> {
        self.overlay.resolve(self.headers, name)
    }

    /// Edits applied to the response before it is returned.
    pub fn headers_mut(&mut self) -> &mut HeaderOverlay {
        self.overlay
    }
}
