//! Per-request state.
//!
//! A `RequestContext` is created by the inbound handler once a route has
//! been selected and is owned by that request's task until the response is
//! produced. Nothing in it is shared with other requests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::{header, request::Parts, HeaderMap, HeaderName, HeaderValue, Method, Uri};
use tokio_util::sync::CancellationToken;

use crate::proxy::headers::{strip_hop_by_hop, HeaderOverlay};
use crate::routing::{MatchResult, Route};

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// State of one in-flight request.
#[derive(Debug)]
pub struct RequestContext {
    request_id: String,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    overlay: HeaderOverlay,
    remote_addr: Option<SocketAddr>,
    route: Arc<Route>,
    path_variables: HashMap<String, String>,
    forward_path: String,
    started: Instant,
    cancel: CancellationToken,
}

impl RequestContext {
    /// Build a context from the inbound request head and its match.
    pub fn new(parts: &Parts, matched: MatchResult, remote_addr: Option<SocketAddr>) -> Self {
        let request_id = parts
            .headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Self {
            request_id,
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
            overlay: HeaderOverlay::default(),
            remote_addr,
            route: matched.route,
            path_variables: matched.path_variables,
            forward_path: matched.forward_path,
            started: Instant::now(),
            cancel: CancellationToken::new(),
        }
    }

    /// Use an externally owned cancellation token (e.g. tied to the client
    /// connection).
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Inbound headers, as received.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Inbound header value with pending filter edits applied.
    pub fn header(&self, name: &HeaderName) -> Option<&HeaderValue> {
        self.overlay.resolve(Some(&self.headers), name)
    }

    /// Edits applied to the upstream request.
    pub fn headers_mut(&mut self) -> &mut HeaderOverlay {
        &mut self.overlay
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    pub fn route(&self) -> &Arc<Route> {
        &self.route
    }

    pub fn path_variables(&self) -> &HashMap<String, String> {
        &self.path_variables
    }

    pub fn forward_path(&self) -> &str {
        &self.forward_path
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Head of the request to send upstream.
    pub fn upstream_request(&self) -> UpstreamRequest {
        let mut headers = self.headers.clone();
        strip_hop_by_hop(&mut headers);

        let original_host = headers.remove(header::HOST);
        if let Some(host) = original_host {
            headers.insert(X_FORWARDED_HOST, host);
        }
        if let Some(addr) = self.remote_addr {
            let ip = addr.ip().to_string();
            let value = match headers.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
                Some(prior) => format!("{}, {}", prior, ip),
                None => ip,
            };
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.insert(X_FORWARDED_FOR, value);
            }
        }
        headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static("http"));
        if let Ok(id) = HeaderValue::from_str(&self.request_id) {
            headers.insert(X_REQUEST_ID, id);
        }

        self.overlay.apply(&mut headers);

        let path_and_query = match self.uri.query() {
            Some(query) => format!("{}?{}", self.forward_path, query),
            None => self.forward_path.clone(),
        };

        UpstreamRequest {
            method: self.method.clone(),
            path_and_query,
            headers,
            request_id: self.request_id.clone(),
        }
    }
}

/// Owned head of the request handed to the forwarder.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    /// Path relative to the route target, with the inbound query.
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub request_id: String,
}

/// Context for a request to `uri` matched against `/service01/**`,
/// from remote address 10.0.0.9.
#[cfg(test)]
pub(crate) fn test_context(uri: &str, headers: &[(&str, &str)]) -> RequestContext {
    use crate::config::RouteDefinition;
    use crate::filter::FilterRegistry;
    use crate::routing::{match_request, RouteTable};

    let table = RouteTable::load(
        &[RouteDefinition::new("/service01/**", "http://backend1")],
        &FilterRegistry::with_builtins(),
    )
    .unwrap();

    let mut builder = axum::http::Request::builder().uri(uri);
    for (k, v) in headers {
        builder = builder.header(*k, *v);
    }
    let (parts, _) = builder.body(()).unwrap().into_parts();
    let matched = match_request(&table, &parts.method, parts.uri.path(), &parts.headers).unwrap();
    RequestContext::new(&parts, matched, Some("10.0.0.9:5555".parse().unwrap()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(uri: &str, headers: &[(&str, &str)]) -> RequestContext {
        test_context(uri, headers)
    }

    #[test]
    fn test_upstream_request_rewrites_head() {
        let mut ctx = context(
            "/service01/x?q=1",
            &[
                ("host", "gateway.local"),
                ("connection", "close"),
                ("x-request-id", "abc"),
                ("x-forwarded-for", "1.2.3.4"),
            ],
        );
        ctx.headers_mut().append(
            HeaderName::from_static("first-request"),
            HeaderValue::from_static("first-request-header"),
        );

        let upstream = ctx.upstream_request();
        assert_eq!(upstream.path_and_query, "/x?q=1");
        assert_eq!(upstream.request_id, "abc");
        assert!(upstream.headers.get("host").is_none());
        assert!(upstream.headers.get("connection").is_none());
        assert_eq!(upstream.headers.get("x-forwarded-host").unwrap(), "gateway.local");
        assert_eq!(upstream.headers.get("x-forwarded-for").unwrap(), "1.2.3.4, 10.0.0.9");
        assert_eq!(upstream.headers.get("first-request").unwrap(), "first-request-header");

        // inbound headers are left as received
        assert!(ctx.headers().get("first-request").is_none());
        assert_eq!(
            ctx.header(&HeaderName::from_static("first-request")).unwrap(),
            "first-request-header"
        );
    }

    #[test]
    fn test_request_id_generated_when_missing() {
        let ctx = context("/service01/x", &[]);
        assert!(uuid::Uuid::parse_str(ctx.request_id()).is_ok());
        assert!(!ctx.is_cancelled());
    }
}
