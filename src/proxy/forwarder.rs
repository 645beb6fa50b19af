//! Upstream forwarding.
//!
//! # Responsibilities
//! - Build the upstream URI from the route target and forward path
//! - Issue the request with a per-route deadline
//! - Stream the response body back without buffering it
//! - Classify failures as Timeout / Connect / Upstream
//!
//! # Design Decisions
//! - The deadline covers everything up to the response head, retries
//!   included; body streaming afterwards is bounded by the inbound
//!   request timeout
//! - Request bodies are streamed, except when a retry may need to replay
//!   them (safe methods with retries enabled and a body known to fit in
//!   `MAX_REPLAY_BODY`); anything else gets a single streamed attempt

use std::time::Duration;

use axum::body::{Body, HttpBody};
use axum::http::{Request, Response, Uri};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use url::Url;

use crate::config::{RetryConfig, TimeoutConfig};
use crate::error::{BoxError, GatewayError};
use crate::proxy::context::UpstreamRequest;
use crate::proxy::headers::strip_hop_by_hop;
use crate::resilience::{with_deadline, RetryPolicy};

/// Largest request body buffered for a replayable attempt.
const MAX_REPLAY_BODY: usize = 1024 * 1024;

/// Issues upstream requests. Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
    default_timeout: Duration,
    retry: RetryPolicy,
}

impl Forwarder {
    pub fn new(timeouts: &TimeoutConfig, retries: &RetryConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Self {
            client,
            default_timeout: Duration::from_millis(timeouts.forward_ms),
            retry: RetryPolicy::from(retries),
        }
    }

    /// Gateway-wide timeout used when a route has none.
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Forward `request` to `target`, failing after `timeout`.
    pub async fn forward(
        &self,
        target: &Url,
        request: UpstreamRequest,
        body: Body,
        timeout: Duration,
    ) -> Result<Response<Body>, GatewayError> {
        let uri = upstream_uri(target, &request.path_and_query)?;
        let target_label = target.as_str().trim_end_matches('/').to_string();

        tracing::debug!(
            request_id = %request.request_id,
            method = %request.method,
            upstream = %uri,
            timeout_ms = timeout.as_millis() as u64,
            "Forwarding request"
        );

        with_deadline(&target_label, timeout, self.send(&target_label, uri, request, body)).await
    }

    async fn send(
        &self,
        target: &str,
        uri: Uri,
        request: UpstreamRequest,
        body: Body,
    ) -> Result<Response<Body>, GatewayError> {
        let attempts = self.retry.attempts_for(&request.method);
        if attempts <= 1 {
            return self.attempt(target, &uri, &request, body).await;
        }
        if !fits_replay_buffer(&body) {
            tracing::debug!(
                request_id = %request.request_id,
                "Request body too large or unsized for replay, not retrying"
            );
            return self.attempt(target, &uri, &request, body).await;
        }

        let bytes = axum::body::to_bytes(body, MAX_REPLAY_BODY)
            .await
            .map_err(|e| GatewayError::RequestBody(Box::new(e)))?;

        let mut attempt = 1;
        loop {
            match self.attempt(target, &uri, &request, Body::from(bytes.clone())).await {
                Ok(response) => return Ok(response),
                Err(err) => match self.retry.next_delay(&request.method, attempt, &err) {
                    Some(delay) => {
                        tracing::info!(
                            request_id = %request.request_id,
                            attempt,
                            delay = ?delay,
                            error = %err,
                            "Retrying upstream request"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => return Err(err),
                },
            }
        }
    }

    async fn attempt(
        &self,
        target: &str,
        uri: &Uri,
        request: &UpstreamRequest,
        body: Body,
    ) -> Result<Response<Body>, GatewayError> {
        let mut builder = Request::builder().method(request.method.clone()).uri(uri.clone());
        if let Some(headers) = builder.headers_mut() {
            headers.extend(request.headers.clone());
        }
        let upstream_request = builder.body(body).map_err(|e| GatewayError::Upstream {
            target: target.to_string(),
            source: Box::new(e),
        })?;

        match self.client.request(upstream_request).await {
            Ok(response) => {
                let (mut parts, incoming) = response.into_parts();
                strip_hop_by_hop(&mut parts.headers);
                Ok(Response::from_parts(parts, Body::new(incoming)))
            }
            Err(e) if e.is_connect() => Err(GatewayError::Connect {
                target: target.to_string(),
                source: Box::new(e) as BoxError,
            }),
            Err(e) => Err(GatewayError::Upstream {
                target: target.to_string(),
                source: Box::new(e),
            }),
        }
    }
}

fn fits_replay_buffer(body: &Body) -> bool {
    body.size_hint()
        .upper()
        .is_some_and(|upper| upper <= MAX_REPLAY_BODY as u64)
}

/// Join the target base URI with a forward path (and query).
pub fn upstream_uri(target: &Url, path_and_query: &str) -> Result<Uri, GatewayError> {
    let base = target.as_str();
    let origin_end = base.len() - target.path().len();
    let origin = &base[..origin_end];
    let base_path = target.path().trim_end_matches('/');

    let suffix = if path_and_query.starts_with('/') {
        path_and_query.to_string()
    } else {
        format!("/{}", path_and_query)
    };

    format!("{}{}{}", origin, base_path, suffix)
        .parse::<Uri>()
        .map_err(|e| GatewayError::Upstream {
            target: base.to_string(),
            source: Box::new(e),
        })
}
