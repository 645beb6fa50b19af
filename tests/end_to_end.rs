//! Requests through a running gateway to real sockets.

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use api_gateway::config::{FilterDefinition, GatewayConfig, Phase, RouteDefinition};
use axum::http::StatusCode;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

mod common;

fn config(routes: Vec<RouteDefinition>) -> GatewayConfig {
    GatewayConfig {
        routes,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_forwards_with_request_and_response_filters() {
    let (backend, hits) = common::start_echo_backend("backend1").await;

    let route = RouteDefinition::new("/service01/**", format!("http://{}", backend))
        .with_id("service01")
        .with_filter(
            FilterDefinition::new("AddRequestHeader", Phase::Pre)
                .with_option("name", "first-request")
                .with_option("value", "first-request-header"),
        )
        .with_filter(
            FilterDefinition::new("AddResponseHeader", Phase::Post)
                .with_option("name", "first-response")
                .with_option("value", "first-response-header"),
        )
        .with_filter(FilterDefinition::new("Logger", Phase::Pre).with_option("base_message", "service01"));
    let gateway = common::start_gateway(config(vec![route])).await;

    let res = common::client()
        .get(gateway.url("/service01/x?page=2"))
        .header("x-request-id", "req-42")
        .send()
        .await
        .expect("gateway unreachable");

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["first-response"], "first-response-header");
    assert_eq!(res.headers()["x-backend"], "backend1");
    assert_eq!(res.headers()["x-request-id"], "req-42");

    let head = res.text().await.unwrap();
    assert!(head.starts_with("GET /x?page=2 HTTP/1.1"), "unexpected head: {}", head);
    assert!(head.contains("first-request: first-request-header"));
    assert!(head.contains("x-request-id: req-42"));
    assert!(head.contains("x-forwarded-for: 127.0.0.1"));
    assert!(head.contains("x-forwarded-proto: http"));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unmatched_request_gets_json_404() {
    let gateway = common::start_gateway(config(Vec::new())).await;

    let res = common::client()
        .get(gateway.url("/nothing/here"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let request_id = res.headers()["x-request-id"].to_str().unwrap().to_string();
    assert!(!request_id.is_empty());

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"]["code"], "NO_ROUTE_FOUND");
    assert_eq!(body["error"]["request_id"], request_id.as_str());
}

#[tokio::test]
async fn test_require_header_short_circuits_before_upstream() {
    let (backend, hits) = common::start_echo_backend("guarded").await;
    // The response header stage is entered before the guard, so it also
    // decorates the guard's rejection.
    let route = RouteDefinition::new("/private/**", format!("http://{}", backend))
        .with_filter(
            FilterDefinition::new("AddResponseHeader", Phase::Post)
                .with_option("name", "x-gateway")
                .with_option("value", "1"),
        )
        .with_filter(FilterDefinition::new("RequireHeader", Phase::Pre).with_option("name", "x-api-key"));
    let gateway = common::start_gateway(config(vec![route])).await;
    let client = common::client();

    let res = client.get(gateway.url("/private/doc")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.headers()["x-gateway"], "1");
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    let res = client
        .get(gateway.url("/private/doc"))
        .header("x-api-key", "k")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_slow_upstream_times_out() {
    let backend = common::start_silent_backend().await;
    let route = RouteDefinition::new("/slow/**", format!("http://{}", backend)).with_timeout_ms(100);
    let gateway = common::start_gateway(config(vec![route])).await;

    let started = Instant::now();
    let res = common::client().get(gateway.url("/slow/x")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);
    assert!(started.elapsed() < Duration::from_secs(2));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"]["code"], "UPSTREAM_TIMEOUT");
}

#[tokio::test]
async fn test_client_disconnect_cancels_upstream_call() {
    let (backend, mut closed) = common::start_silent_backend_reporting_close().await;
    let route = RouteDefinition::new("/slow/**", format!("http://{}", backend)).with_timeout_ms(20_000);
    let gateway = common::start_gateway(config(vec![route])).await;

    let mut client = TcpStream::connect(gateway.addr).await.unwrap();
    client
        .write_all(b"GET /slow/x HTTP/1.1\r\nHost: gateway.test\r\n\r\n")
        .await
        .unwrap();

    // Let the request reach the backend, then hang up.
    tokio::time::sleep(Duration::from_millis(300)).await;
    drop(client);

    let result = tokio::time::timeout(Duration::from_secs(5), closed.recv()).await;
    // Well before the 20s route timeout could have fired.
    assert!(matches!(result, Ok(Some(()))), "upstream connection was not closed");
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    let backend = common::closed_port().await;
    let route = RouteDefinition::new("/down/**", format!("http://{}", backend));
    let gateway = common::start_gateway(config(vec![route])).await;

    let res = common::client().get(gateway.url("/down")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"]["code"], "UPSTREAM_CONNECT_ERROR");
}

#[tokio::test]
async fn test_prefix_kept_when_strip_prefix_is_off() {
    let (backend, _) = common::start_echo_backend("api").await;
    let mut route = RouteDefinition::new("/api/**", format!("http://{}/base", backend));
    route.strip_prefix = false;
    let gateway = common::start_gateway(config(vec![route])).await;

    let res = common::client().get(gateway.url("/api/v1/items")).send().await.unwrap();
    let head = res.text().await.unwrap();
    assert!(head.starts_with("GET /base/api/v1/items HTTP/1.1"), "unexpected head: {}", head);
}

#[tokio::test]
async fn test_most_specific_route_wins() {
    let (short, short_hits) = common::start_echo_backend("short").await;
    let (long, long_hits) = common::start_echo_backend("long").await;
    let gateway = common::start_gateway(config(vec![
        RouteDefinition::new("/a/**", format!("http://{}", short)),
        RouteDefinition::new("/a/b/**", format!("http://{}", long)),
    ]))
    .await;

    let res = common::client().get(gateway.url("/a/b/c")).send().await.unwrap();
    assert_eq!(res.headers()["x-backend"], "long");
    assert_eq!(long_hits.load(Ordering::SeqCst), 1);
    assert_eq!(short_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_connect_failures_are_retried_for_safe_methods() {
    let backend = common::closed_port().await;
    let mut config = config(vec![RouteDefinition::new("/flaky/**", format!("http://{}", backend))]);
    config.retries.enabled = true;
    config.retries.max_attempts = 5;
    config.retries.base_delay_ms = 100;
    let gateway = common::start_gateway(config).await;

    // Bring the backend up while the gateway is backing off.
    let hits = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        let listener = tokio::net::TcpListener::bind(backend).await.unwrap();
        common::serve_echo(listener, "flaky")
    });

    let res = common::client().get(gateway.url("/flaky/x")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(hits.await.unwrap().load(Ordering::SeqCst), 1);
}
