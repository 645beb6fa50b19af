//! Rejects requests that lack a header.

use async_trait::async_trait;
use axum::http::{HeaderName, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::config::Phase;
use crate::error::BoxError;
use crate::filter::builtin::headers::header_name;
use crate::filter::spec::FilterSpec;
use crate::filter::{FilterAction, GatewayFilter};
use crate::proxy::{RequestContext, X_REQUEST_ID};

#[derive(Debug, Clone)]
pub struct RequireHeader {
    header: HeaderName,
    status: StatusCode,
}

impl RequireHeader {
    pub fn new(header: HeaderName, status: StatusCode) -> Self {
        Self { header, status }
    }

    pub fn from_spec(spec: &FilterSpec) -> Result<Self, String> {
        spec.expect_phase(&[Phase::Pre])?;
        spec.allow_options(&["name", "status"])?;

        let status = match spec.u16_option("status")? {
            None => StatusCode::UNAUTHORIZED,
            Some(code) => StatusCode::from_u16(code)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .ok_or_else(|| format!("status {} is not a 4xx/5xx status", code))?,
        };

        Ok(Self::new(header_name(spec)?, status))
    }
}

#[async_trait]
impl GatewayFilter for RequireHeader {
    fn name(&self) -> &str {
        "RequireHeader"
    }

    async fn pre(&self, ctx: &mut RequestContext) -> Result<FilterAction, BoxError> {
        if ctx.header(&self.header).is_some() {
            return Ok(FilterAction::Continue);
        }

        tracing::info!(
            request_id = %ctx.request_id(),
            header = %self.header,
            "Rejecting request without required header"
        );

        let body = Json(json!({
            "error": {
                "code": "MISSING_HEADER",
                "message": format!("missing required header '{}'", self.header),
                "request_id": ctx.request_id(),
            }
        }));
        let mut response = (self.status, body).into_response();
        if let Ok(id) = ctx.request_id().parse() {
            response.headers_mut().insert(X_REQUEST_ID, id);
        }
        Ok(FilterAction::Respond(response))
    }
}
