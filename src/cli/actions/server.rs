use crate::{
    api::{self, Upstream},
    gate::{Gate, GateConfig, StorageType},
};
use anyhow::Result;
use secrecy::SecretString;
use tracing::{info, warn};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub upstream: Url,
    pub redirect_target: Option<String>,
    pub platform_suffix: String,
    pub password: Option<SecretString>,
    pub username: Option<String>,
    pub storage_type: StorageType,
    /// Asset prefixes; `None` keeps the built-in list.
    pub exempt_prefixes: Option<Vec<String>>,
    pub cookie_max_age_seconds: u64,
}

impl Args {
    #[must_use]
    pub fn gate_config(&self) -> GateConfig {
        let config = GateConfig::new()
            .with_redirect_target(self.redirect_target.clone())
            .with_platform_suffix(self.platform_suffix.clone())
            .with_secret(self.password.clone())
            .with_username(self.username.clone())
            .with_storage_type(self.storage_type)
            .with_cookie_max_age_seconds(self.cookie_max_age_seconds);

        match &self.exempt_prefixes {
            Some(prefixes) => config.with_exempt_prefixes(prefixes.clone()),
            None => config,
        }
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the upstream client cannot be built or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let config = args.gate_config();

    if config.secret().is_none() {
        warn!("No password configured: protected pages redirect to /warning");
    }
    if config.storage_type().uses_signature() && config.username().is_none() {
        warn!(
            "Storage type {} signs cookies but no username is configured: /api/login rejects every attempt",
            config.storage_type()
        );
    }

    let upstream = Upstream::new(args.upstream)?;

    api::new(args.port, Gate::new(config), upstream).await
}

fn log_startup_args(args: &Args) {
    let exempt = args.exempt_prefixes.as_ref().map_or_else(
        || "defaults".to_string(),
        |prefixes| prefixes.join(","),
    );
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("upstream", args.upstream.to_string()),
        (
            "redirect_target",
            args.redirect_target
                .clone()
                .unwrap_or_else(|| "none".to_string()),
        ),
        ("platform_suffix", args.platform_suffix.clone()),
        ("storage_type", args.storage_type.to_string()),
        ("password_set", args.password.is_some().to_string()),
        (
            "username",
            args.username.clone().unwrap_or_else(|| "n/a".to_string()),
        ),
        ("exempt_prefixes", exempt),
        ("cookie_max_age", format!("{}s", args.cookie_max_age_seconds)),
    ];
    log_entries("Startup configuration", &entries);
}

fn log_entries(title: &str, entries: &[(&str, String)]) {
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "edgegate {} - {}\n\n{title}:",
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    trimmed.get(..7).unwrap_or(trimmed)
}
