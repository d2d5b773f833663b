//! End-to-end scenarios through the full gateway router.
//!
//! Each test builds the real router, sends one request with
//! `tower::ServiceExt::oneshot`, and asserts on status and exact body text.
//! Upstream origins are local mocks.

use crate::mock_infrastructure::OriginMock;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use gpm_core::{config::AppConfig, upstream::ProxyPool};
use server::router::{build_router, GatewayState};
use std::sync::Arc;
use tower::ServiceExt;

const TEST_HTML: &str = "<!DOCTYPE html>\n<html>\n  <body>\n    <h1>Herman Melville - Moby-Dick</h1>\n    <p>Call me Ishmael.</p>\n  </body>\n</html>";

fn test_state(api_key: &str) -> Arc<GatewayState> {
    let config = AppConfig {
        max_timeout: 2,
        concurrent_tries: 2,
        server_api_key: api_key.to_string(),
        ..AppConfig::default()
    };

    Arc::new(GatewayState::new(
        config,
        Arc::new(ProxyPool::default()),
    ))
}

fn uri_encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("read body");
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}

#[tokio::test]
async fn test_happy_html_path() {
    let mut origin = OriginMock::new().await;
    origin.mock_get_with_header(200, ("content-type", "text/html"), TEST_HTML);

    let app = build_router(test_state("secret"));
    let uri = format!("/get?url={}&api_key=secret", uri_encode(&origin.url()));

    let request = Request::builder().uri(uri).body(Body::empty()).expect("request builds");
    let response = app.oneshot(request).await.expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .expect("content type copied");
    assert_eq!(content_type, "text/html");

    let body = body_to_string(response.into_body()).await;
    assert_eq!(body, TEST_HTML, "body must pass through byte-for-byte");
}

#[tokio::test]
async fn test_upstream_500_becomes_502() {
    let mut origin = OriginMock::new().await;
    origin.mock_get(500, "upstream exploded");

    let app = build_router(test_state(""));
    let uri = format!("/get?url={}", uri_encode(&origin.url()));

    let request = Request::builder().uri(uri).body(Body::empty()).expect("request builds");
    let response = app.oneshot(request).await.expect("router responds");

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let body = body_to_string(response.into_body()).await;
    let expected = format!("error status 500 received from {}", origin.url());
    assert!(body.contains(&expected), "unexpected body: {body}");
}

#[tokio::test]
async fn test_unreachable_origin_becomes_502() {
    let app = build_router(test_state(""));
    let uri = format!("/get?url={}", uri_encode("http://127.0.0.1:9/"));

    let request = Request::builder().uri(uri).body(Body::empty()).expect("request builds");
    let response = app.oneshot(request).await.expect("router responds");

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let body = body_to_string(response.into_body()).await;
    assert!(body.starts_with("request to"), "unexpected body: {body}");
}

#[tokio::test]
async fn test_invalid_url_argument() {
    let app = build_router(test_state(""));

    let request = Request::builder()
        .uri("/get?url=wrong")
        .body(Body::empty())
        .expect("request builds");
    let response = app.oneshot(request).await.expect("router responds");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_to_string(response.into_body()).await;
    assert_eq!(body, "passed url value does not match a valid url pattern");
}

#[tokio::test]
async fn test_missing_url_argument() {
    let app = build_router(test_state(""));

    let request = Request::builder().uri("/get").body(Body::empty()).expect("request builds");
    let response = app.oneshot(request).await.expect("router responds");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_to_string(response.into_body()).await;
    assert_eq!(body, "no [url] query param found");
}

#[tokio::test]
async fn test_api_key_required_but_absent() {
    let app = build_router(test_state("secret"));

    let request = Request::builder().uri("/get").body(Body::empty()).expect("request builds");
    let response = app.oneshot(request).await.expect("router responds");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_to_string(response.into_body()).await;
    assert_eq!(body, "API key is missing");
}

#[tokio::test]
async fn test_api_key_required_but_wrong() {
    let app = build_router(test_state("secret"));

    let request = Request::builder()
        .uri("/get?api_key=incorrect")
        .body(Body::empty())
        .expect("request builds");
    let response = app.oneshot(request).await.expect("router responds");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_to_string(response.into_body()).await;
    assert_eq!(body, "API key is invalid");
}

#[tokio::test]
async fn test_api_key_empty_value_counts_as_missing() {
    let app = build_router(test_state("secret"));

    let request = Request::builder()
        .uri("/get?api_key=")
        .body(Body::empty())
        .expect("request builds");
    let response = app.oneshot(request).await.expect("router responds");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_to_string(response.into_body()).await;
    assert_eq!(body, "API key is missing");
}

#[tokio::test]
async fn test_base64_url_argument_roundtrips() {
    let mut origin = OriginMock::new().await;
    origin.mock_get(200, "decoded destination reached");

    let app = build_router(test_state(""));
    let encoded = BASE64.encode(origin.url().as_bytes());
    let uri = format!("/get?url={}", uri_encode(&encoded));

    let request = Request::builder().uri(uri).body(Body::empty()).expect("request builds");
    let response = app.oneshot(request).await.expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_to_string(response.into_body()).await;
    assert_eq!(body, "decoded destination reached");
}

#[tokio::test]
async fn test_json_body_streams_through() {
    let payload = serde_json::json!({
        "slideshow": { "title": "Sample Slide Show", "slides": [ {"title": "Overview"} ] }
    })
    .to_string();

    let mut origin = OriginMock::new().await;
    origin.mock_get_with_header(200, ("content-type", "application/json"), &payload);

    let app = build_router(test_state(""));
    let uri = format!("/get?url={}", uri_encode(&origin.url()));

    let request = Request::builder().uri(uri).body(Body::empty()).expect("request builds");
    let response = app.oneshot(request).await.expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_to_string(response.into_body()).await;
    let roundtripped: serde_json::Value = serde_json::from_str(&body).expect("json body");
    assert_eq!(roundtripped["slideshow"]["title"], "Sample Slide Show");
}
