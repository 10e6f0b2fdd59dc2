//! Gate configuration, fixed for the lifetime of the process.

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use std::{fmt, str::FromStr};

pub const DEFAULT_PLATFORM_SUFFIX: &str = ".pages.dev";
pub const DEFAULT_COOKIE_MAX_AGE_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Static assets that bypass authentication unless replaced through
/// [`GateConfig::with_exempt_prefixes`].
pub const DEFAULT_EXEMPT_PREFIXES: &[&str] = &[
    "/_next",
    "/favicon.ico",
    "/robots.txt",
    "/manifest.json",
    "/icons/",
    "/logo.png",
    "/screenshot.png",
];

/// Public pages and session endpoints. Always exempt: gating them would send
/// `/login` and `/warning` back to themselves.
pub const PUBLIC_ROUTES: &[&str] = &[
    "/login",
    "/warning",
    "/api/login",
    "/api/register",
    "/api/logout",
    "/api/cron",
    "/api/server-config",
];

/// Where user credentials live. Only `localstorage` keeps the password in the
/// cookie; every other backend signs the username instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageType {
    #[default]
    LocalStorage,
    Redis,
    Upstash,
    Kvrocks,
    D1,
}

impl StorageType {
    pub const ALL: [Self; 5] = [
        Self::LocalStorage,
        Self::Redis,
        Self::Upstash,
        Self::Kvrocks,
        Self::D1,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LocalStorage => "localstorage",
            Self::Redis => "redis",
            Self::Upstash => "upstash",
            Self::Kvrocks => "kvrocks",
            Self::D1 => "d1",
        }
    }

    /// `true` when cookies are checked by signature instead of password.
    #[must_use]
    pub const fn uses_signature(self) -> bool {
        !matches!(self, Self::LocalStorage)
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|storage| storage.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| format!("invalid storage type: {value}"))
    }
}

/// Hostname, optionally followed by a port.
#[must_use]
pub fn valid_redirect_target(target: &str) -> bool {
    Regex::new(
        r"^(?i)[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?(\.[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?)*(:[0-9]{1,5})?$",
    )
    .is_ok_and(|regex| regex.is_match(target))
}

#[derive(Debug, Clone)]
pub struct GateConfig {
    redirect_target: Option<String>,
    platform_suffix: String,
    secret: Option<SecretString>,
    username: Option<String>,
    storage_type: StorageType,
    exempt_prefixes: Vec<String>,
    cookie_max_age_seconds: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl GateConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            redirect_target: None,
            platform_suffix: DEFAULT_PLATFORM_SUFFIX.to_string(),
            secret: None,
            username: None,
            storage_type: StorageType::default(),
            exempt_prefixes: DEFAULT_EXEMPT_PREFIXES
                .iter()
                .map(ToString::to_string)
                .collect(),
            cookie_max_age_seconds: DEFAULT_COOKIE_MAX_AGE_SECONDS,
        }
    }

    #[must_use]
    pub fn with_redirect_target(mut self, target: Option<String>) -> Self {
        self.redirect_target = target
            .map(|target| target.trim().to_ascii_lowercase())
            .filter(|target| !target.is_empty());
        self
    }

    #[must_use]
    pub fn with_platform_suffix(mut self, suffix: String) -> Self {
        self.platform_suffix = suffix.trim().to_ascii_lowercase();
        self
    }

    #[must_use]
    pub fn with_secret(mut self, secret: Option<SecretString>) -> Self {
        self.secret = secret;
        self
    }

    #[must_use]
    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.username = username
            .map(|username| username.trim().to_string())
            .filter(|username| !username.is_empty());
        self
    }

    #[must_use]
    pub fn with_storage_type(mut self, storage_type: StorageType) -> Self {
        self.storage_type = storage_type;
        self
    }

    #[must_use]
    pub fn with_exempt_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.exempt_prefixes = prefixes
            .into_iter()
            .map(|prefix| prefix.trim().to_string())
            .filter(|prefix| !prefix.is_empty())
            .collect();
        self
    }

    #[must_use]
    pub fn with_cookie_max_age_seconds(mut self, seconds: u64) -> Self {
        self.cookie_max_age_seconds = seconds;
        self
    }

    #[must_use]
    pub fn redirect_target(&self) -> Option<&str> {
        self.redirect_target.as_deref()
    }

    #[must_use]
    pub fn platform_suffix(&self) -> &str {
        &self.platform_suffix
    }

    /// The shared secret, or `None` when it is unset or empty.
    #[must_use]
    pub fn secret(&self) -> Option<&SecretString> {
        self.secret
            .as_ref()
            .filter(|secret| !secret.expose_secret().is_empty())
    }

    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    #[must_use]
    pub fn storage_type(&self) -> StorageType {
        self.storage_type
    }

    #[must_use]
    pub fn exempt_prefixes(&self) -> &[String] {
        &self.exempt_prefixes
    }

    #[must_use]
    pub fn cookie_max_age_seconds(&self) -> u64 {
        self.cookie_max_age_seconds
    }

    /// Public routes plus the configured asset prefixes.
    #[must_use]
    pub fn is_exempt(&self, path: &str) -> bool {
        PUBLIC_ROUTES.iter().any(|route| path.starts_with(route))
            || self
                .exempt_prefixes
                .iter()
                .any(|prefix| path.starts_with(prefix.as_str()))
    }
}
