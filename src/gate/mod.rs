//! Per-request gate: domain redirect first, then the auth check.
//!
//! Flow Overview: build a [`RequestContext`] from the request, call
//! [`Gate::evaluate`], and act on the [`Decision`]. Only [`Decision::Allow`]
//! lets the request reach the upstream.

pub mod config;
pub mod cookie;
mod error;
pub mod redirect;
pub mod signature;

pub use self::config::{GateConfig, StorageType};
pub use self::cookie::AuthCookie;
pub use self::error::Error;

use axum::http::{
    header::{COOKIE, HOST},
    HeaderMap, Uri,
};
use tracing::{debug, instrument, warn};
use url::form_urlencoded;

pub const LOGIN_PATH: &str = "/login";
pub const WARNING_PATH: &str = "/warning";
const API_PREFIX: &str = "/api";

/// The parts of a request the gate looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub hostname: String,
    pub path: String,
    pub query: Option<String>,
    pub cookie_header: Option<String>,
}

impl RequestContext {
    #[must_use]
    pub fn new(hostname: &str, path: &str, query: Option<&str>, cookies: Option<&str>) -> Self {
        Self {
            hostname: host_without_port(hostname).to_ascii_lowercase(),
            path: path.to_string(),
            query: query.map(ToString::to_string),
            cookie_header: cookies.map(ToString::to_string),
        }
    }

    /// Hostname comes from the URI authority, falling back to `Host`. Multiple
    /// `Cookie` headers are joined.
    #[must_use]
    pub fn from_request(uri: &Uri, headers: &HeaderMap) -> Self {
        let hostname = uri
            .host()
            .or_else(|| headers.get(HOST).and_then(|value| value.to_str().ok()))
            .unwrap_or_default();

        let cookies: Vec<&str> = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect();
        let cookies = (!cookies.is_empty()).then(|| cookies.join("; "));

        Self::new(hostname, uri.path(), uri.query(), cookies.as_deref())
    }

    /// Path plus `?query` when the query is non-empty.
    #[must_use]
    pub fn path_and_query(&self) -> String {
        match self.query.as_deref() {
            Some(query) if !query.is_empty() => format!("{}?{query}", self.path),
            _ => self.path.clone(),
        }
    }

    fn is_api(&self) -> bool {
        self.path.starts_with(API_PREFIX)
    }
}

/// Hostname without port or the trailing dot of a fully-qualified name.
fn host_without_port(host: &str) -> &str {
    let host = host.trim();
    if let Some(rest) = host.strip_prefix('[') {
        // IPv6 literal
        return rest.split(']').next().unwrap_or(rest);
    }
    let host = host.split(':').next().unwrap_or(host);
    host.strip_suffix('.').unwrap_or(host)
}

/// Outcome of evaluating one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Forward to the upstream.
    Allow,
    /// Permanent redirect to the canonical domain.
    Redirect { location: String },
    /// No secret is configured; send pages to the warning page.
    Warning,
    /// Page request without valid credentials; `return_to` is the original
    /// path and query.
    Login { return_to: String },
    /// API request without valid credentials.
    Unauthorized,
}

/// `/login?redirect=<return_to>`, form-urlencoded.
#[must_use]
pub fn login_location(return_to: &str) -> String {
    format!(
        "{LOGIN_PATH}?{}",
        form_urlencoded::Serializer::new(String::new())
            .append_pair("redirect", return_to)
            .finish()
    )
}

/// Stateless evaluator over a fixed [`GateConfig`].
#[derive(Debug)]
pub struct Gate {
    config: GateConfig,
}

impl Gate {
    #[must_use]
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    #[instrument(skip_all, fields(host = %ctx.hostname, path = %ctx.path))]
    pub fn evaluate(&self, ctx: &RequestContext) -> Decision {
        if let Some(location) = redirect::redirect_target(&self.config, ctx) {
            debug!("Redirecting to canonical domain: {location}");
            return Decision::Redirect { location };
        }

        if self.config.is_exempt(&ctx.path) {
            return Decision::Allow;
        }

        let Some(secret) = self.config.secret() else {
            warn!("No password configured, sending request to {WARNING_PATH}");
            return Decision::Warning;
        };

        let cookie = match ctx
            .cookie_header
            .as_deref()
            .ok_or(Error::MissingCookie)
            .and_then(AuthCookie::from_cookie_header)
        {
            Ok(cookie) => cookie,
            Err(err) => {
                debug!("Auth cookie rejected: {err}");
                return Self::deny(ctx);
            }
        };

        let valid = if self.config.storage_type().uses_signature() {
            cookie.has_valid_signature(secret)
        } else {
            cookie.matches_password(secret)
        };

        if valid {
            Decision::Allow
        } else {
            debug!(
                "Invalid credentials for storage type {}",
                self.config.storage_type()
            );
            Self::deny(ctx)
        }
    }

    fn deny(ctx: &RequestContext) -> Decision {
        if ctx.is_api() {
            Decision::Unauthorized
        } else {
            Decision::Login {
                return_to: ctx.path_and_query(),
            }
        }
    }
}
