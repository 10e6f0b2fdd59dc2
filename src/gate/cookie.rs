//! The `auth` cookie: a percent-encoded JSON object.
//!
//! In `localstorage` mode it carries the password itself; in every other mode
//! it carries the username and an HMAC-SHA256 signature over it.

use axum::http::{header::InvalidHeaderValue, HeaderValue};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    time::{SystemTime, UNIX_EPOCH},
};
use subtle::ConstantTimeEq;

use super::{signature, Error};

pub const AUTH_COOKIE_NAME: &str = "auth";

// Same set `encodeURIComponent` leaves untouched, so browser-written cookies
// round-trip unchanged.
const COOKIE_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthCookie {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Issued-at, milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

// Credentials stay out of logs.
impl fmt::Debug for AuthCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthCookie")
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("username", &self.username)
            .field("signature", &self.signature.as_ref().map(|_| "[REDACTED]"))
            .field("role", &self.role)
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

impl AuthCookie {
    /// Cookie for `localstorage` mode.
    #[must_use]
    pub fn with_password(password: &str, role: &str) -> Self {
        Self {
            password: Some(password.to_string()),
            role: Some(role.to_string()),
            timestamp: Some(now_millis()),
            ..Self::default()
        }
    }

    /// Cookie for signature mode.
    ///
    /// # Errors
    /// Returns an error if the signature cannot be computed.
    pub fn signed(username: &str, secret: &SecretString, role: &str) -> Result<Self, Error> {
        Ok(Self {
            username: Some(username.to_string()),
            signature: Some(signature::sign(secret.expose_secret(), username)?),
            role: Some(role.to_string()),
            timestamp: Some(now_millis()),
            ..Self::default()
        })
    }

    /// Find and decode the `auth` pair in a `Cookie` header.
    ///
    /// # Errors
    /// Returns an error if the cookie is absent or its value cannot be decoded.
    pub fn from_cookie_header(header: &str) -> Result<Self, Error> {
        let raw = header
            .split(';')
            .find_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                (name.trim() == AUTH_COOKIE_NAME).then(|| value.trim())
            })
            .filter(|value| !value.is_empty())
            .ok_or(Error::MissingCookie)?;

        let decoded = percent_decode_str(raw).decode_utf8()?;
        Ok(serde_json::from_str(&decoded)?)
    }

    /// Encode as a cookie value.
    ///
    /// # Errors
    /// Returns an error if the payload cannot be serialized.
    pub fn to_cookie_value(&self) -> Result<String, Error> {
        let json = serde_json::to_string(self)?;
        Ok(utf8_percent_encode(&json, COOKIE_VALUE).to_string())
    }

    /// Direct mode: the carried password equals the secret.
    #[must_use]
    pub fn matches_password(&self, secret: &SecretString) -> bool {
        self.password
            .as_deref()
            .filter(|password| !password.is_empty())
            .is_some_and(|password| secret_matches(secret, password))
    }

    /// Signature mode: username and signature are present and the signature
    /// verifies against the secret.
    #[must_use]
    pub fn has_valid_signature(&self, secret: &SecretString) -> bool {
        match (self.username.as_deref(), self.signature.as_deref()) {
            (Some(username), Some(sig)) if !username.is_empty() && !sig.is_empty() => {
                signature::verify(secret.expose_secret(), username, sig)
            }
            _ => false,
        }
    }
}

/// Constant-time comparison of a candidate password against the secret.
#[must_use]
pub fn secret_matches(secret: &SecretString, candidate: &str) -> bool {
    secret
        .expose_secret()
        .as_bytes()
        .ct_eq(candidate.as_bytes())
        .into()
}

/// `Set-Cookie` value that stores the auth cookie.
///
/// # Errors
/// Returns an error if the value contains characters not allowed in headers.
pub fn set_cookie(value: &str, max_age_seconds: u64) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{AUTH_COOKIE_NAME}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_seconds}"
    ))
}

/// `Set-Cookie` value that removes the auth cookie.
#[must_use]
pub fn clear_cookie() -> HeaderValue {
    HeaderValue::from_static("auth=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
        })
}
