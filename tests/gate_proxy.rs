//! Integration tests for the gate in front of a live upstream.
//!
//! A small axum app bound to an ephemeral port plays the origin; it echoes
//! what it received so the tests can check what the gate forwarded:
//! 1. Allowed requests reach the origin with path, query, cookie and body.
//! 2. Forwarding headers are added and `Host` is not leaked.
//! 3. Upstream redirects are relayed to the client, not followed.
//!    Large responses are relayed whole.
//! 4. Denied requests never reach the origin.

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::{
        header::{CONTENT_TYPE, COOKIE, HOST, LOCATION, SET_COOKIE},
        HeaderMap, Method, StatusCode,
    },
    response::{IntoResponse, Redirect},
    routing::get,
    Json, Router,
};
use edgegate::{
    api::{self, Upstream},
    gate::{Gate, GateConfig, StorageType},
};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tokio::net::TcpListener;
use tower::ServiceExt;
use url::Url;

const HOSTNAME: &str = "tv.example.com";
const LARGE_BODY_BYTES: usize = 8 * 1024 * 1024;

async fn echo(headers: HeaderMap, request: Request) -> impl IntoResponse {
    let method = request.method().to_string();
    let uri = request.uri().to_string();
    let body = to_bytes(request.into_body(), usize::MAX)
        .await
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default();
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string)
    };

    Json(json!({
        "method": method,
        "uri": uri,
        "body": body,
        "host": header("host"),
        "cookie": header("cookie"),
        "x_forwarded_host": header("x-forwarded-host"),
        "x_forwarded_proto": header("x-forwarded-proto"),
    }))
}

struct Origin {
    url: Url,
    hits: Arc<AtomicUsize>,
}

async fn spawn_origin() -> Result<Origin> {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    let app = Router::new()
        .route("/moved", get(|| async { Redirect::to("/elsewhere") }))
        .route("/large", get(|| async { vec![b'x'; LARGE_BODY_BYTES] }))
        .fallback(echo)
        .layer(axum::middleware::from_fn(
            move |request: Request, next: axum::middleware::Next| {
                counter.fetch_add(1, Ordering::SeqCst);
                next.run(request)
            },
        ));

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(Origin {
        url: Url::parse(&format!("http://{addr}"))?,
        hits,
    })
}

fn gateway(origin: &Origin, config: GateConfig) -> Result<Router> {
    let upstream = Upstream::new(origin.url.clone())?;
    Ok(api::router(Arc::new(Gate::new(config)), Arc::new(upstream)))
}

fn config() -> GateConfig {
    GateConfig::new()
        .with_secret(Some(SecretString::from("s3cret".to_string())))
        .with_redirect_target(Some(HOSTNAME.to_string()))
}

async fn json_body(response: axum::response::Response) -> Result<Value> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn login(app: Router, body: Value) -> Result<String> {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/login")
        .header(HOST, HOSTNAME)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))?;
    let response = app.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(SET_COOKIE)
        .context("missing Set-Cookie")?
        .to_str()?;
    Ok(set_cookie
        .split(';')
        .next()
        .context("empty Set-Cookie")?
        .to_string())
}

#[tokio::test]
async fn allowed_request_is_forwarded() -> Result<()> {
    let origin = spawn_origin().await?;
    let cookie = login(gateway(&origin, config())?, json!({"password": "s3cret"})).await?;

    let request = Request::builder()
        .method(Method::PUT)
        .uri("/api/favorites?key=a%20b")
        .header(HOST, HOSTNAME)
        .header(COOKIE, &cookie)
        .body(Body::from("payload"))?;
    let response = gateway(&origin, config())?.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let echoed = json_body(response).await?;
    assert_eq!(echoed["method"], "PUT");
    assert_eq!(echoed["uri"], "/api/favorites?key=a%20b");
    assert_eq!(echoed["body"], "payload");
    assert_eq!(echoed["cookie"], cookie.as_str());
    assert_eq!(echoed["x_forwarded_host"], HOSTNAME);
    assert_eq!(echoed["x_forwarded_proto"], "http");
    assert_ne!(echoed["host"], HOSTNAME);
    assert_eq!(origin.hits.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn signed_cookie_is_forwarded() -> Result<()> {
    let origin = spawn_origin().await?;
    let config = config()
        .with_storage_type(StorageType::Upstash)
        .with_username(Some("owner".to_string()));

    let cookie = login(
        gateway(&origin, config.clone())?,
        json!({"username": "owner", "password": "s3cret"}),
    )
    .await?;

    let request = Request::builder()
        .uri("/play?id=9")
        .header(HOST, HOSTNAME)
        .header(COOKIE, &cookie)
        .body(Body::empty())?;
    let response = gateway(&origin, config)?.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await?["uri"], "/play?id=9");
    Ok(())
}

#[tokio::test]
async fn exempt_path_is_forwarded_without_cookie() -> Result<()> {
    let origin = spawn_origin().await?;
    let request = Request::builder()
        .uri("/_next/static/chunk.js")
        .header(HOST, HOSTNAME)
        .body(Body::empty())?;
    let response = gateway(&origin, config())?.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(origin.hits.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn upstream_redirect_is_relayed() -> Result<()> {
    let origin = spawn_origin().await?;
    let request = Request::builder()
        .uri("/moved")
        .header(HOST, HOSTNAME)
        .header(COOKIE, login(gateway(&origin, config())?, json!({"password": "s3cret"})).await?)
        .body(Body::empty())?;
    let response = gateway(&origin, config())?.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok()),
        Some("/elsewhere")
    );
    Ok(())
}

#[tokio::test]
async fn denied_requests_never_reach_origin() -> Result<()> {
    let origin = spawn_origin().await?;

    let wrong = Request::builder()
        .uri("/api/favorites")
        .header(HOST, HOSTNAME)
        .header(COOKIE, "auth=%7B%22password%22%3A%22nope%22%7D")
        .body(Body::empty())?;
    let response = gateway(&origin, config())?.oneshot(wrong).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let page = Request::builder()
        .uri("/")
        .header(HOST, HOSTNAME)
        .body(Body::empty())?;
    let response = gateway(&origin, config())?.oneshot(page).await?;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);

    let platform = Request::builder()
        .uri("/")
        .header(HOST, "moontv.pages.dev")
        .body(Body::empty())?;
    let response = gateway(&origin, config())?.oneshot(platform).await?;
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);

    assert_eq!(origin.hits.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn custom_exempt_list_keeps_login_reachable() -> Result<()> {
    let origin = spawn_origin().await?;
    let custom = || config().with_exempt_prefixes(vec!["/public".to_string()]);

    // the login page is served by the origin, no redirect loop
    let page = Request::builder()
        .uri("/login?redirect=%2Fplay")
        .header(HOST, HOSTNAME)
        .body(Body::empty())?;
    let response = gateway(&origin, custom())?.oneshot(page).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await?["uri"], "/login?redirect=%2Fplay");

    // and a session can still be opened
    let cookie = login(gateway(&origin, custom())?, json!({"password": "s3cret"})).await?;
    let request = Request::builder()
        .uri("/play")
        .header(HOST, HOSTNAME)
        .header(COOKIE, &cookie)
        .body(Body::empty())?;
    let response = gateway(&origin, custom())?.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(origin.hits.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn large_response_is_relayed() -> Result<()> {
    let origin = spawn_origin().await?;
    let request = Request::builder()
        .uri("/large")
        .header(HOST, HOSTNAME)
        .header(COOKIE, login(gateway(&origin, config())?, json!({"password": "s3cret"})).await?)
        .body(Body::empty())?;
    let response = gateway(&origin, config())?.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await?;
    assert_eq!(body.len(), LARGE_BODY_BYTES);
    assert!(body.iter().all(|byte| *byte == b'x'));
    Ok(())
}
