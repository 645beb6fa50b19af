//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create the Axum router and wire up middleware (request id, tracing,
//!   inbound timeout)
//! - Match each request against the live route table
//! - Run the route's filter chain around the upstream call
//! - Turn every failure into a JSON error response
//! - Record request metrics
//!
//! # Design Decisions
//! - The route table is loaded once per request; a reload during the
//!   request does not affect it
//! - Dropping the handler future (client went away) cancels the request
//!   token, which stops the upstream call and any remaining filters

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, request::Parts, HeaderValue, Request, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::Instrument;

use crate::admin::RouteStore;
use crate::config::{ConfigError, GatewayConfig};
use crate::error::GatewayError;
use crate::filter::{self, FilterRegistry};
use crate::observability::metrics;
use crate::proxy::{Forwarder, RequestContext};
use crate::resilience::forward_timeout;
use crate::routing::match_request;

/// State injected into the gateway handler.
#[derive(Clone)]
pub struct GatewayState {
    pub store: Arc<RouteStore>,
    pub forwarder: Forwarder,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    store: Arc<RouteStore>,
    config: GatewayConfig,
}

impl HttpServer {
    /// Compile the configured routes with the built-in filters.
    pub fn new(config: GatewayConfig) -> Result<Self, ConfigError> {
        let store = Arc::new(RouteStore::from_config(&config, FilterRegistry::with_builtins())?);
        Ok(Self::with_store(config, store))
    }

    /// Serve from an existing store (shared with the admin API and the
    /// reload task).
    pub fn with_store(config: GatewayConfig, store: Arc<RouteStore>) -> Self {
        let state = GatewayState {
            store: store.clone(),
            forwarder: Forwarder::new(&config.timeouts, &config.retries),
        };
        let router = Self::build_router(&config, state);
        Self {
            router,
            store,
            config,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: GatewayState) -> Router {
        Router::new()
            .route("/", any(gateway_handler))
            .route("/{*path}", any(gateway_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// The router, for embedding or for driving it without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn store(&self) -> Arc<RouteStore> {
        self.store.clone()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Accept connections on `listener` until `shutdown` is cancelled, then
    /// drain in-flight requests.
    pub async fn run(self, listener: TcpListener, shutdown: CancellationToken) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.store.current().len(),
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Match, filter and forward one request.
async fn gateway_handler(State(state): State<GatewayState>, request: Request<Body>) -> Response<Body> {
    let start = Instant::now();
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let (mut parts, body) = request.into_parts();
    authority_as_host(&mut parts);
    let method = parts.method.to_string();

    let table = state.store.current();
    let matched = match match_request(&table, &parts.method, parts.uri.path(), &parts.headers) {
        Ok(matched) => matched,
        Err(err) => {
            let request_id = parts
                .headers
                .get("x-request-id")
                .and_then(|v| v.to_str().ok());
            tracing::warn!(
                request_id = ?request_id,
                method = %parts.method,
                path = %parts.uri.path(),
                "No route matched"
            );
            metrics::record_request(&method, metrics::NO_ROUTE, err.status().as_u16(), start);
            return err.into_response_with_id(request_id);
        }
    };

    let route = matched.route.clone();
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();
    let mut ctx = RequestContext::new(&parts, matched, remote_addr).with_cancellation(cancel);

    let span = tracing::info_span!(
        "request",
        request_id = %ctx.request_id(),
        method = %parts.method,
        path = %parts.uri.path(),
        route = %route.id,
    );

    let forwarder = state.forwarder.clone();
    let target = route.target.clone();
    let timeout = forward_timeout(route.timeout, forwarder.default_timeout());

    let result = filter::execute(&route, &mut ctx, move |upstream| async move {
        forwarder.forward(&target, upstream, body, timeout).await
    })
    .instrument(span.clone())
    .await;

    let response = match result {
        Ok(response) => response,
        Err(err) => {
            span.in_scope(|| log_failure(&err));
            err.into_response_with_id(Some(ctx.request_id()))
        }
    };

    metrics::record_request(&method, &route.id, response.status().as_u16(), start);
    guard.disarm();
    response
}

/// HTTP/2 carries the host in `:authority` rather than a `Host` header.
fn authority_as_host(parts: &mut Parts) {
    if parts.headers.contains_key(header::HOST) {
        return;
    }
    let host = parts
        .uri
        .authority()
        .map(|authority| authority.as_str().rsplit('@').next().unwrap_or_default())
        .and_then(|host| HeaderValue::from_str(host).ok());
    if let Some(host) = host {
        parts.headers.insert(header::HOST, host);
    }
}

fn log_failure(err: &GatewayError) {
    match err {
        GatewayError::Filter(_) | GatewayError::Cancelled => {
            tracing::info!(code = err.code(), error = %err, "Request ended early")
        }
        GatewayError::RequestBody(_) => tracing::warn!(code = err.code(), error = %err, "Bad request body"),
        _ => tracing::error!(code = err.code(), error = %err, "Upstream request failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteDefinition;
    use tower::ServiceExt;

    fn config(routes: Vec<RouteDefinition>) -> GatewayConfig {
        GatewayConfig {
            routes,
            ..Default::default()
        }
    }

    #[test]
    fn test_route_timeout_above_request_ceiling_is_rejected() {
        let mut config = config(vec![RouteDefinition::new("/slow/**", "http://slow").with_timeout_ms(5000)]);
        config.timeouts.request_secs = 1;

        let err = HttpServer::new(config).err().expect("route timeout above the ceiling");
        assert!(err.to_string().contains("must be below timeouts.request_secs"));
    }

    #[test]
    fn test_authority_fills_missing_host() {
        let (mut parts, _) = Request::builder()
            .uri("http://user@api.example.com:8443/x")
            .body(())
            .unwrap()
            .into_parts();
        authority_as_host(&mut parts);
        assert_eq!(parts.headers[header::HOST], "api.example.com:8443");

        let (mut parts, _) = Request::builder()
            .uri("http://other.example.com/x")
            .header(header::HOST, "api.example.com")
            .body(())
            .unwrap()
            .into_parts();
        authority_as_host(&mut parts);
        assert_eq!(parts.headers[header::HOST], "api.example.com");
    }

    #[tokio::test]
    async fn test_host_route_matches_authority_only_request() {
        let server = HttpServer::new(config(vec![
            RouteDefinition::new("/api/**", "http://127.0.0.1:1").with_host("api.example.com")
        ]))
        .unwrap();

        let request = Request::builder()
            .uri("http://api.example.com/api/x")
            .body(Body::empty())
            .unwrap();
        assert!(request.headers().get(header::HOST).is_none());

        let response = server.router().oneshot(request).await.unwrap();
        // Matched and forwarded; nothing listens on the target port.
        assert_eq!(response.status(), axum::http::StatusCode::BAD_GATEWAY);
    }
}
