//! Header editing filters.

use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue};

use crate::config::Phase;
use crate::error::BoxError;
use crate::filter::spec::FilterSpec;
use crate::filter::{FilterAction, GatewayFilter, ResponseView};
use crate::proxy::RequestContext;

pub(crate) fn header_name(spec: &FilterSpec) -> Result<HeaderName, String> {
    let raw = spec.required_str("name")?;
    HeaderName::from_bytes(raw.as_bytes()).map_err(|_| format!("invalid header name '{}'", raw))
}

fn header_value(spec: &FilterSpec) -> Result<HeaderValue, String> {
    let raw = spec.required_str("value")?;
    HeaderValue::from_str(raw).map_err(|_| format!("invalid header value '{}'", raw))
}

/// Appends a header to the upstream request.
#[derive(Debug, Clone)]
pub struct AddRequestHeader {
    name: HeaderName,
    value: HeaderValue,
}

impl AddRequestHeader {
    pub fn new(name: HeaderName, value: HeaderValue) -> Self {
        Self { name, value }
    }

    pub fn from_spec(spec: &FilterSpec) -> Result<Self, String> {
        spec.expect_phase(&[Phase::Pre])?;
        spec.allow_options(&["name", "value"])?;
        Ok(Self::new(header_name(spec)?, header_value(spec)?))
    }
}

#[async_trait]
impl GatewayFilter for AddRequestHeader {
    fn name(&self) -> &str {
        "AddRequestHeader"
    }

    async fn pre(&self, ctx: &mut RequestContext) -> Result<FilterAction, BoxError> {
        ctx.headers_mut().append(self.name.clone(), self.value.clone());
        Ok(FilterAction::Continue)
    }
}

/// Drops a header from the upstream request.
#[derive(Debug, Clone)]
pub struct RemoveRequestHeader {
    name: HeaderName,
}

impl RemoveRequestHeader {
    pub fn from_spec(spec: &FilterSpec) -> Result<Self, String> {
        spec.expect_phase(&[Phase::Pre])?;
        spec.allow_options(&["name"])?;
        Ok(Self { name: header_name(spec)? })
    }
}

#[async_trait]
impl GatewayFilter for RemoveRequestHeader {
    fn name(&self) -> &str {
        "RemoveRequestHeader"
    }

    async fn pre(&self, ctx: &mut RequestContext) -> Result<FilterAction, BoxError> {
        ctx.headers_mut().remove(self.name.clone());
        Ok(FilterAction::Continue)
    }
}

/// Appends a header to the client response.
#[derive(Debug, Clone)]
pub struct AddResponseHeader {
    name: HeaderName,
    value: HeaderValue,
}

impl AddResponseHeader {
    pub fn new(name: HeaderName, value: HeaderValue) -> Self {
        Self { name, value }
    }

    pub fn from_spec(spec: &FilterSpec) -> Result<Self, String> {
        spec.expect_phase(&[Phase::Post])?;
        spec.allow_options(&["name", "value"])?;
        Ok(Self::new(header_name(spec)?, header_value(spec)?))
    }
}

#[async_trait]
impl GatewayFilter for AddResponseHeader {
    fn name(&self) -> &str {
        "AddResponseHeader"
    }

    async fn post(&self, _ctx: &RequestContext, response: &mut ResponseView<'_>) -> Result<(), BoxError> {
        response.headers_mut().append(self.name.clone(), self.value.clone());
        Ok(())
    }
}

/// Drops a header from the client response.
#[derive(Debug, Clone)]
pub struct RemoveResponseHeader {
    name: HeaderName,
}

impl RemoveResponseHeader {
    pub fn from_spec(spec: &FilterSpec) -> Result<Self, String> {
        spec.expect_phase(&[Phase::Post])?;
        spec.allow_options(&["name"])?;
        Ok(Self { name: header_name(spec)? })
    }
}

#[async_trait]
impl GatewayFilter for RemoveResponseHeader {
    fn name(&self) -> &str {
        "RemoveResponseHeader"
    }

    async fn post(&self, _ctx: &RequestContext, response: &mut ResponseView<'_>) -> Result<(), BoxError> {
        response.headers_mut().remove(self.name.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Response;

    use crate::config::FilterDefinition;
    use crate::proxy::context::test_context;
    use crate::proxy::HeaderOverlay;

    fn spec(def: FilterDefinition) -> FilterSpec {
        FilterSpec::from_definition(&def).unwrap()
    }

    #[test]
    fn test_options_are_checked_at_load() {
        let ok = spec(
            FilterDefinition::new("AddRequestHeader", Phase::Pre)
                .with_option("name", "first-request")
                .with_option("value", "first-request-header"),
        );
        assert!(AddRequestHeader::from_spec(&ok).is_ok());

        let wrong_phase = spec(
            FilterDefinition::new("AddRequestHeader", Phase::Post)
                .with_option("name", "a")
                .with_option("value", "b"),
        );
        assert!(AddRequestHeader::from_spec(&wrong_phase).is_err());

        let bad_name = spec(
            FilterDefinition::new("RemoveRequestHeader", Phase::Pre).with_option("name", "bad name"),
        );
        assert!(RemoveRequestHeader::from_spec(&bad_name).is_err());

        let typo = spec(
            FilterDefinition::new("RemoveResponseHeader", Phase::Post)
                .with_option("name", "server")
                .with_option("vaule", "x"),
        );
        assert!(RemoveResponseHeader::from_spec(&typo).is_err());
    }

    #[tokio::test]
    async fn test_request_edits_reach_upstream_head() {
        let mut ctx = test_context("/service01/x", &[("x-internal", "secret")]);
        AddRequestHeader::new(
            HeaderName::from_static("first-request"),
            HeaderValue::from_static("first-request-header"),
        )
        .pre(&mut ctx)
        .await
        .unwrap();
        RemoveRequestHeader {
            name: HeaderName::from_static("x-internal"),
        }
        .pre(&mut ctx)
        .await
        .unwrap();

        let upstream = ctx.upstream_request();
        assert_eq!(upstream.headers.get("first-request").unwrap(), "first-request-header");
        assert!(upstream.headers.get("x-internal").is_none());
        assert_eq!(ctx.headers().get("x-internal").unwrap(), "secret");
    }

    #[tokio::test]
    async fn test_response_edits_go_through_overlay() {
        let ctx = test_context("/service01/x", &[]);
        let mut upstream = Response::new(Body::empty());
        upstream
            .headers_mut()
            .insert("server", HeaderValue::from_static("backend"));
        let outcome = Ok(upstream);
        let mut overlay = HeaderOverlay::default();

        let mut view = ResponseView::new(&outcome, &mut overlay);
        AddResponseHeader::new(
            HeaderName::from_static("first-response"),
            HeaderValue::from_static("first-response-header"),
        )
        .post(&ctx, &mut view)
        .await
        .unwrap();
        RemoveResponseHeader {
            name: HeaderName::from_static("server"),
        }
        .post(&ctx, &mut view)
        .await
        .unwrap();

        assert_eq!(
            view.header(&HeaderName::from_static("first-response")).unwrap(),
            "first-response-header"
        );
        assert!(view.header(&HeaderName::from_static("server")).is_none());

        let mut response = outcome.unwrap();
        overlay.apply(response.headers_mut());
        assert!(response.headers().get("server").is_none());
        assert_eq!(response.headers().get("first-response").unwrap(), "first-response-header");
    }
}
