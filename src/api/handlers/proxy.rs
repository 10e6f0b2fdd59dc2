//! Forward requests the gate allowed to the upstream origin.

use anyhow::{bail, Context, Result};
use axum::{
    body::{Body, HttpBody},
    extract::{Extension, Request},
    http::{header::HOST, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use reqwest::{redirect::Policy, Client};
use std::{sync::Arc, time::Duration};
use tracing::{error, instrument};
use url::Url;

const CONNECT_TIMEOUT_SECONDS: u64 = 10;

const X_FORWARDED_HOST: &str = "x-forwarded-host";
const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// The origin behind the gate.
#[derive(Debug, Clone)]
pub struct Upstream {
    base: Url,
    client: Client,
}

impl Upstream {
    /// # Errors
    /// Returns an error if the URL is not plain `http(s)` or the HTTP client
    /// cannot be built.
    pub fn new(base: Url) -> Result<Self> {
        if !matches!(base.scheme(), "http" | "https") {
            bail!("unsupported upstream scheme: {}", base.scheme());
        }
        if base.query().is_some() || base.fragment().is_some() {
            bail!("upstream URL must not carry a query or fragment: {base}");
        }

        // Upstream redirects are relayed to the client, never followed here.
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .redirect(Policy::none())
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECONDS))
            .build()
            .context("Failed to build upstream HTTP client")?;

        Ok(Self { base, client })
    }

    /// Join `path_and_query` onto the upstream base, keeping any base path.
    ///
    /// # Errors
    /// Returns an error if the result is not a valid URL.
    pub fn url_for(&self, path_and_query: &str) -> Result<Url, url::ParseError> {
        let base = self.base.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}{path_and_query}"))
    }
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailer"
            | "transfer-encoding"
            | "upgrade"
    )
}

fn request_headers(incoming: &HeaderMap) -> HeaderMap {
    let mut headers: HeaderMap = incoming
        .iter()
        .filter(|(name, _)| !is_hop_by_hop(name) && **name != HOST)
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    if let Some(host) = incoming.get(HOST) {
        if !headers.contains_key(X_FORWARDED_HOST) {
            headers.insert(X_FORWARDED_HOST, host.clone());
        }
    }
    if !headers.contains_key(X_FORWARDED_PROTO) {
        headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static("http"));
    }

    headers
}

fn response_headers(upstream: &HeaderMap) -> HeaderMap {
    upstream
        .iter()
        .filter(|(name, _)| !is_hop_by_hop(name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

// axum fallback handler
#[instrument(skip_all, fields(method = %request.method(), path = %request.uri().path()))]
pub async fn forward(upstream: Extension<Arc<Upstream>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();

    let path_and_query = parts
        .uri
        .path_and_query()
        .map_or("/", axum::http::uri::PathAndQuery::as_str);

    let url = match upstream.url_for(path_and_query) {
        Ok(url) => url,
        Err(err) => {
            error!("Invalid upstream URL for {path_and_query}: {err}");
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    let mut builder = upstream
        .client
        .request(parts.method, url)
        .headers(request_headers(&parts.headers));

    // Bodies are streamed in both directions. An empty body is left off so
    // GET requests do not go out chunked.
    if body.size_hint().exact() != Some(0) {
        builder = builder.body(reqwest::Body::wrap_stream(body.into_data_stream()));
    }

    let upstream_response = match builder.send().await {
        Ok(response) => response,
        Err(err) => {
            error!("Upstream request failed: {err}");
            return (StatusCode::BAD_GATEWAY, "Bad Gateway").into_response();
        }
    };

    let status = upstream_response.status();
    let headers = response_headers(upstream_response.headers());

    let mut response = Response::new(Body::from_stream(upstream_response.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
