//! Integration tests for the edge router.
//!
//! Each test builds the full router (gate middleware, forwarding fallback and
//! the open health route) in front of a mock upstream, then drives it with
//! `oneshot` requests:
//! 1. Visitors without a session cookie are relayed to the upstream.
//! 2. Visitors carrying the session cookie are bounced to the product app.
//! 3. Excluded and always-allowed paths bypass the redirect.
//! 4. Dot segments are resolved before the gate decides, and the upstream
//!    receives the resolved path.
//! 5. Oversized bodies, unreachable and slow upstreams map to 413, 502 and 504.

use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{header::COOKIE, header::LOCATION, Request, StatusCode},
    Router,
};
use scanerio::{
    edge::{
        self,
        handlers::{Upstream, DEFAULT_UPSTREAM_TIMEOUT, MAX_BODY_BYTES},
    },
    gate::{AccessGate, GateConfig, GatePolicy},
};
use std::{net::TcpListener, sync::Arc, time::Duration};
use tower::ServiceExt;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

const REDIRECT_URL: &str = "https://app.scanerio.com";

fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

fn app(upstream_url: &str, policy: GatePolicy) -> Result<Router> {
    app_with_timeout(upstream_url, policy, DEFAULT_UPSTREAM_TIMEOUT)
}

fn app_with_timeout(upstream_url: &str, policy: GatePolicy, timeout: Duration) -> Result<Router> {
    let gate = AccessGate::new(GateConfig::new(REDIRECT_URL).with_policy(policy));
    Ok(edge::router(
        Arc::new(gate),
        Upstream::new(upstream_url, timeout)?,
    ))
}

fn location(response: &axum::response::Response) -> Option<&str> {
    response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
}

async fn upstream_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| request.url.path().to_string())
        .collect()
}

async fn upstream_page(server: &MockServer, page: &str) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!("page {page}")))
        .mount(server)
        .await;
}

async fn body_text(response: axum::response::Response) -> Result<String> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(String::from_utf8(bytes.to_vec())?)
}

#[tokio::test]
async fn visitor_without_session_reaches_upstream() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    upstream_page(&server, "/dashboard").await;

    let response = app(&server.uri(), GatePolicy::RedirectSignedIn)?
        .oneshot(Request::builder().uri("/dashboard").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(body_text(response).await?, "page /dashboard");
    Ok(())
}

#[tokio::test]
async fn signed_in_visitor_is_redirected_to_app() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    upstream_page(&server, "/dashboard").await;

    let response = app(&server.uri(), GatePolicy::RedirectSignedIn)?
        .oneshot(
            Request::builder()
                .uri("/dashboard")
                .header(COOKIE, "theme=dark; refreshToken=abc")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), Some(REDIRECT_URL));
    assert!(upstream_paths(&server).await.is_empty());
    Ok(())
}

#[tokio::test]
async fn excluded_and_always_allowed_paths_are_relayed() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    upstream_page(&server, "/api/user").await;
    upstream_page(&server, "/logout").await;

    for page in ["/api/user", "/logout"] {
        let response = app(&server.uri(), GatePolicy::RedirectSignedIn)?
            .oneshot(
                Request::builder()
                    .uri(page)
                    .header(COOKIE, "refreshToken=abc")
                    .body(Body::empty())?,
            )
            .await?;

        assert_eq!(response.status(), StatusCode::OK, "{page}");
        assert_eq!(body_text(response).await?, format!("page {page}"));
    }
    Ok(())
}

#[tokio::test]
async fn require_session_sends_visitors_to_login() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    upstream_page(&server, "/auth").await;

    let router = app(&server.uri(), GatePolicy::RequireSession)?;

    let response = router
        .clone()
        .oneshot(Request::builder().uri("/dashboard").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), Some("/auth"));

    let response = router
        .oneshot(Request::builder().uri("/auth").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn health_is_never_gated() -> Result<()> {
    let router = app("http://127.0.0.1:9", GatePolicy::RedirectSignedIn)?;

    let response = router
        .oneshot(
            Request::builder()
                .uri("/health")
                .header(COOKIE, "refreshToken=abc")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_text(response).await?)?;
    assert_eq!(body["name"], env!("CARGO_PKG_NAME"));
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    Ok(())
}

#[tokio::test]
async fn unreachable_upstream_is_bad_gateway() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    // Grab a free port and release it so nothing is listening there.
    let port = TcpListener::bind("127.0.0.1:0")?.local_addr()?.port();

    let response = app(&format!("http://127.0.0.1:{port}"), GatePolicy::RedirectSignedIn)?
        .oneshot(Request::builder().uri("/pricing").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    Ok(())
}

#[tokio::test]
async fn dot_segments_cannot_reach_private_pages_anonymously() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    upstream_page(&server, "/dashboard").await;

    for page in [
        "/auth/../dashboard",
        "/auth/%2e%2e/dashboard",
        "/auth/%2E%2E/dashboard",
        "/auth/./../dashboard",
    ] {
        let response = app(&server.uri(), GatePolicy::RequireSession)?
            .oneshot(Request::builder().uri(page).body(Body::empty())?)
            .await?;

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT, "{page}");
        assert_eq!(location(&response), Some("/auth"), "{page}");
    }
    assert!(upstream_paths(&server).await.is_empty());
    Ok(())
}

#[tokio::test]
async fn dot_segments_cannot_skip_the_signed_in_redirect() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    upstream_page(&server, "/dashboard").await;

    for page in ["/logout/../dashboard", "/refresh/%2e%2e/dashboard", "/api/../dashboard"] {
        let response = app(&server.uri(), GatePolicy::RedirectSignedIn)?
            .oneshot(
                Request::builder()
                    .uri(page)
                    .header(COOKIE, "refreshToken=abc")
                    .body(Body::empty())?,
            )
            .await?;

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT, "{page}");
        assert_eq!(location(&response), Some(REDIRECT_URL), "{page}");
    }
    assert!(upstream_paths(&server).await.is_empty());
    Ok(())
}

#[tokio::test]
async fn upstream_receives_the_resolved_path() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    upstream_page(&server, "/dashboard").await;

    let response = app(&server.uri(), GatePolicy::RedirectSignedIn)?
        .oneshot(
            Request::builder()
                .uri("/pricing/../dashboard?tab=reports")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await?, "page /dashboard");

    let received = server.received_requests().await.unwrap_or_default();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].url.path(), "/dashboard");
    assert_eq!(received[0].url.query(), Some("tab=reports"));
    Ok(())
}

#[tokio::test]
async fn oversized_body_is_payload_too_large() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let response = app(&server.uri(), GatePolicy::RedirectSignedIn)?
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/contact")
                .body(Body::from(vec![b'a'; MAX_BODY_BYTES + 1]))?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(upstream_paths(&server).await.is_empty());
    Ok(())
}

#[tokio::test]
async fn slow_upstream_is_gateway_timeout() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pricing"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let response = app_with_timeout(
        &server.uri(),
        GatePolicy::RedirectSignedIn,
        Duration::from_millis(200),
    )?
    .oneshot(Request::builder().uri("/pricing").body(Body::empty())?)
    .await?;

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    Ok(())
}
