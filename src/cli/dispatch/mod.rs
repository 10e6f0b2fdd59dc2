use crate::{
    cli::{
        actions::{server::Args, Action},
        commands::gate,
    },
    gate::{config::valid_redirect_target, StorageType},
};
use anyhow::{bail, Context, Result};
use secrecy::SecretString;
use url::Url;

/// # Errors
/// Returns an error if required arguments are missing or invalid.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);

    let upstream = matches
        .get_one::<String>("upstream")
        .context("missing required argument: --upstream")?;
    let upstream = Url::parse(upstream).context("invalid EDGEGATE_UPSTREAM")?;

    let redirect_target = matches
        .get_one::<String>(gate::ARG_REDIRECT_TARGET)
        .map(|target| target.trim().to_string())
        .filter(|target| !target.is_empty());
    if let Some(target) = &redirect_target {
        if !valid_redirect_target(target) {
            bail!("invalid EDGEGATE_REDIRECT_TARGET: {target} (expected a hostname, optionally with a port)");
        }
    }

    let platform_suffix = matches
        .get_one::<String>(gate::ARG_PLATFORM_SUFFIX)
        .cloned()
        .unwrap_or_default();

    let password = matches
        .get_one::<String>(gate::ARG_PASSWORD)
        .filter(|password| !password.is_empty())
        .map(|password| SecretString::from(password.clone()));

    let username = matches.get_one::<String>(gate::ARG_USERNAME).cloned();

    let storage_type = matches
        .get_one::<StorageType>(gate::ARG_STORAGE_TYPE)
        .copied()
        .unwrap_or_default();

    let exempt_prefixes = matches
        .get_many::<String>(gate::ARG_EXEMPT_PREFIX)
        .map(|values| values.cloned().collect());

    let cookie_max_age_seconds = matches
        .get_one::<u64>(gate::ARG_COOKIE_MAX_AGE)
        .copied()
        .unwrap_or(crate::gate::config::DEFAULT_COOKIE_MAX_AGE_SECONDS);

    Ok(Action::Server(Args {
        port,
        upstream,
        redirect_target,
        platform_suffix,
        password,
        username,
        storage_type,
        exempt_prefixes,
        cookie_max_age_seconds,
    }))
}
