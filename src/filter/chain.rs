//! Filter chain construction and execution.
//!
//! A chain is a list of stages. A stage groups the pre and post halves
//! that share a filter id, in the order the id was first declared.
//!
//! # Execution
//! - Stages are entered in order; entering a stage runs its pre hook
//! - A pre hook that responds or fails stops further entry and skips
//!   the upstream call
//! - Post hooks of every entered stage run in reverse entry order, exactly
//!   once, whether the outcome is a response or a failure
//! - The first post hook failure replaces the outcome; later post hooks
//!   still run
//! - Once the request is cancelled no further hook runs

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Response;

use crate::config::{FilterDefinition, Phase, ValidationError};
use crate::error::{BoxError, FilterError, GatewayError};
use crate::filter::registry::FilterRegistry;
use crate::filter::spec::FilterSpec;
use crate::filter::{FilterAction, GatewayFilter, ResponseView};
use crate::proxy::{HeaderOverlay, RequestContext, UpstreamRequest};
use crate::routing::Route;

struct BoundFilter {
    spec: FilterSpec,
    filter: Arc<dyn GatewayFilter>,
}

impl BoundFilter {
    fn error(&self, cause: BoxError) -> GatewayError {
        FilterError::new(self.spec.id(), cause)
            .with_status(self.spec.error_status())
            .into()
    }
}

struct Stage {
    id: String,
    pre: Option<BoundFilter>,
    post: Option<BoundFilter>,
}

/// Compiled filters of one route.
#[derive(Default)]
pub struct FilterChain {
    stages: Vec<Stage>,
}

impl FilterChain {
    /// Instantiate `definitions` for `route_id`, reporting every problem.
    pub fn build(
        route_id: &str,
        definitions: &[FilterDefinition],
        registry: &FilterRegistry,
    ) -> Result<Self, Vec<ValidationError>> {
        let mut errors = Vec::new();
        let mut stages: Vec<Stage> = Vec::new();

        for def in definitions {
            let spec = match FilterSpec::from_definition(def) {
                Ok(spec) => spec,
                Err(reason) => {
                    errors.push(ValidationError::InvalidFilter {
                        route: route_id.to_string(),
                        filter: def.name.clone(),
                        reason,
                    });
                    continue;
                }
            };

            let filter = match registry.build(&spec) {
                None => {
                    errors.push(ValidationError::UnknownFilter {
                        route: route_id.to_string(),
                        filter: spec.name().to_string(),
                    });
                    continue;
                }
                Some(Err(reason)) => {
                    errors.push(ValidationError::InvalidFilter {
                        route: route_id.to_string(),
                        filter: spec.id().to_string(),
                        reason,
                    });
                    continue;
                }
                Some(Ok(filter)) => filter,
            };

            let index = match stages.iter().position(|s| s.id == spec.id()) {
                Some(index) => index,
                None => {
                    stages.push(Stage {
                        id: spec.id().to_string(),
                        pre: None,
                        post: None,
                    });
                    stages.len() - 1
                }
            };

            let stage = &mut stages[index];
            let slot = match spec.phase() {
                Phase::Pre => &mut stage.pre,
                Phase::Post => &mut stage.post,
            };
            if slot.is_some() {
                errors.push(ValidationError::DuplicateFilter {
                    route: route_id.to_string(),
                    filter: spec.id().to_string(),
                    phase: spec.phase(),
                });
                continue;
            }
            *slot = Some(BoundFilter { spec, filter });
        }

        if errors.is_empty() {
            Ok(Self { stages })
        } else {
            Err(errors)
        }
    }

    /// Stage ids in entry order.
    pub fn stage_ids(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.stage_ids()).finish()
    }
}

/// Run `route`'s filters around `forward`.
///
/// `forward` receives the upstream request head (inbound headers with all
/// pre hook edits applied) and is called at most once.
pub async fn execute<F, Fut>(
    route: &Route,
    ctx: &mut RequestContext,
    forward: F,
) -> Result<Response<Body>, GatewayError>
where
    F: FnOnce(UpstreamRequest) -> Fut,
    Fut: Future<Output = Result<Response<Body>, GatewayError>>,
{
    let stages = &route.filters.stages;
    let cancel = ctx.cancellation().clone();
    let mut entered = 0;
    let mut early: Option<Result<Response<Body>, GatewayError>> = None;

    for stage in stages {
        if cancel.is_cancelled() {
            early = Some(Err(GatewayError::Cancelled));
            break;
        }
        entered += 1;

        let Some(pre) = &stage.pre else { continue };
        match pre.filter.pre(ctx).await {
            Ok(FilterAction::Continue) => {}
            Ok(FilterAction::Respond(response)) => {
                tracing::debug!(
                    request_id = %ctx.request_id(),
                    filter = %stage.id,
                    status = %response.status(),
                    "Filter answered request"
                );
                early = Some(Ok(response));
                break;
            }
            Err(cause) => {
                let err = pre.error(cause);
                tracing::warn!(request_id = %ctx.request_id(), error = %err, "Pre filter failed");
                early = Some(Err(err));
                break;
            }
        }
    }

    let outcome = match early {
        Some(outcome) => outcome,
        None => {
            let upstream = ctx.upstream_request();
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(GatewayError::Cancelled),
                result = forward(upstream) => result,
            }
        }
    };

    let mut overlay = HeaderOverlay::default();
    let mut post_failure: Option<GatewayError> = None;

    for stage in stages[..entered].iter().rev() {
        let Some(post) = &stage.post else { continue };
        if cancel.is_cancelled() {
            tracing::debug!(request_id = %ctx.request_id(), "Request cancelled, skipping post filters");
            return Err(GatewayError::Cancelled);
        }

        let mut view = ResponseView::new(&outcome, &mut overlay);
        if let Err(cause) = post.filter.post(ctx, &mut view).await {
            let err = post.error(cause);
            tracing::warn!(request_id = %ctx.request_id(), error = %err, "Post filter failed");
            if post_failure.is_none() {
                post_failure = Some(err);
            }
        }
    }

    if let Some(err) = post_failure {
        return Err(err);
    }
    outcome.map(|mut response| {
        overlay.apply(response.headers_mut());
        response
    })
}
