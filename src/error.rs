//! Per-request error taxonomy.
//!
//! # Design Decisions
//! - Every per-request failure becomes a well-formed response, never a
//!   dropped connection
//! - Each variant carries a stable code for logs and client bodies
//! - Configuration errors live in `config::loader` since they never reach
//!   a client

use std::time::Duration;

use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Status used when the client went away before a response was produced.
/// Not part of the IANA registry, but the de-facto "client closed request".
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

/// Boxed cause carried by filter and upstream failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure raised by a filter hook, tagged with the filter that raised it.
#[derive(Debug, Error)]
#[error("filter '{filter_name}' failed: {cause}")]
pub struct FilterError {
    pub filter_name: String,
    #[source]
    pub cause: BoxError,
    /// Status surfaced to the client (500 unless the filter configures another).
    pub status: StatusCode,
}

impl FilterError {
    pub fn new(filter_name: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        Self {
            filter_name: filter_name.into(),
            cause: cause.into(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

/// Errors produced while serving a single request.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no route found for {method} {path}")]
    NoRouteFound { method: String, path: String },

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("upstream {target} did not respond within {after:?}")]
    Timeout { target: String, after: Duration },

    #[error("failed to connect to upstream {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: BoxError,
    },

    #[error("upstream {target} failed: {source}")]
    Upstream {
        target: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to read request body: {0}")]
    RequestBody(#[source] BoxError),

    #[error("client cancelled the request")]
    Cancelled,
}

impl GatewayError {
    /// Stable identifier, safe to log and to expose to clients.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::NoRouteFound { .. } => "NO_ROUTE_FOUND",
            GatewayError::Filter(_) => "FILTER_ERROR",
            GatewayError::Timeout { .. } => "UPSTREAM_TIMEOUT",
            GatewayError::Connect { .. } => "UPSTREAM_CONNECT_ERROR",
            GatewayError::Upstream { .. } => "UPSTREAM_ERROR",
            GatewayError::RequestBody(_) => "REQUEST_BODY_ERROR",
            GatewayError::Cancelled => "CLIENT_CLOSED_REQUEST",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::NoRouteFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::Filter(e) => e.status,
            GatewayError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Connect { .. } | GatewayError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::RequestBody(_) => StatusCode::BAD_REQUEST,
            GatewayError::Cancelled => StatusCode::from_u16(CLIENT_CLOSED_REQUEST)
                .unwrap_or(StatusCode::BAD_REQUEST),
        }
    }

    /// Render the error as a JSON response, echoing the request id if known.
    pub fn into_response_with_id(self, request_id: Option<&str>) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
                "request_id": request_id,
            }
        }));

        let mut response = (status, body).into_response();
        if let Some(id) = request_id.and_then(|id| HeaderValue::from_str(id).ok()) {
            response.headers_mut().insert("x-request-id", id);
        }
        response
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        self.into_response_with_id(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let not_found = GatewayError::NoRouteFound {
            method: "GET".into(),
            path: "/missing".into(),
        };
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(not_found.code(), "NO_ROUTE_FOUND");

        let timeout = GatewayError::Timeout {
            target: "http://backend".into(),
            after: Duration::from_millis(100),
        };
        assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);

        assert_eq!(GatewayError::Cancelled.status().as_u16(), 499);

        let body = GatewayError::RequestBody("length limit exceeded".into());
        assert_eq!(body.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body.code(), "REQUEST_BODY_ERROR");
    }

    #[test]
    fn test_filter_error_uses_configured_status() {
        let err: GatewayError = FilterError::new("auth", "bad token")
            .with_status(StatusCode::UNAUTHORIZED)
            .into();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.code(), "FILTER_ERROR");
        assert!(err.to_string().contains("auth"));

        let default: GatewayError = FilterError::new("logger", "boom").into();
        assert_eq!(default.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_error_body_carries_request_id() {
        let response = GatewayError::Cancelled.into_response_with_id(Some("req-1"));
        assert_eq!(response.headers().get("x-request-id").unwrap(), "req-1");

        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["error"]["code"], "CLIENT_CLOSED_REQUEST");
        assert_eq!(value["error"]["request_id"], "req-1");
    }
}
