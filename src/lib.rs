//! # edgegate (Edge Auth Gate)
//!
//! `edgegate` sits in front of a web application and decides, per request,
//! whether the request is forwarded to the upstream origin.
//!
//! Every request goes through the same chain:
//!
//! 1. **Domain redirect:** requests that arrive on a platform-assigned hostname
//!    (for example `app.pages.dev`) are sent to the canonical domain with a
//!    `301`, keeping path and query.
//! 2. **Exempt paths:** static assets and the public pages (`/login`,
//!    `/warning`, session endpoints) pass without looking at cookies.
//! 3. **Secret check:** with no shared secret configured every protected page
//!    is sent to `/warning`.
//! 4. **Cookie check:** the `auth` cookie is validated either by comparing the
//!    password it carries (`localstorage` mode) or by verifying an HMAC-SHA256
//!    signature over the username (every other storage type).
//!
//! Denied API calls get a `401`; denied pages are redirected to `/login` with
//! the original location in the `redirect` query parameter.
//!
//! No state is kept between requests. The gate itself lives in [`gate`], the
//! HTTP wiring (middleware, proxy, session endpoints) in [`api`].

pub mod api;
pub mod cli;
pub mod gate;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
