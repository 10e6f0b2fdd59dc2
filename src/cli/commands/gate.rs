use crate::gate::{config::DEFAULT_PLATFORM_SUFFIX, StorageType};
use clap::{builder::ValueParser, Arg, ArgAction, Command};

pub const ARG_REDIRECT_TARGET: &str = "redirect-target";
pub const ARG_PLATFORM_SUFFIX: &str = "platform-suffix";
pub const ARG_PASSWORD: &str = "password";
pub const ARG_USERNAME: &str = "username";
pub const ARG_STORAGE_TYPE: &str = "storage-type";
pub const ARG_EXEMPT_PREFIX: &str = "exempt-prefix";
pub const ARG_COOKIE_MAX_AGE: &str = "cookie-max-age";

#[must_use]
pub fn validator_storage_type() -> ValueParser {
    ValueParser::from(move |value: &str| -> std::result::Result<StorageType, String> {
        value.parse::<StorageType>()
    })
}

pub fn with_args(command: Command) -> Command {
    let command = with_redirect_args(command);
    with_auth_args(command)
}

fn with_redirect_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_REDIRECT_TARGET)
                .long(ARG_REDIRECT_TARGET)
                .help("Canonical domain; requests on the platform suffix are redirected here")
                .env("EDGEGATE_REDIRECT_TARGET"),
        )
        .arg(
            Arg::new(ARG_PLATFORM_SUFFIX)
                .long(ARG_PLATFORM_SUFFIX)
                .help("Hostname suffix of platform-assigned domains")
                .env("EDGEGATE_PLATFORM_SUFFIX")
                .default_value(DEFAULT_PLATFORM_SUFFIX),
        )
}

fn with_auth_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PASSWORD)
                .long(ARG_PASSWORD)
                .help("Shared secret: the login password and the cookie signing key")
                .long_help(
                    "Shared secret: the login password and the cookie signing key. When unset, every protected page is redirected to /warning.",
                )
                .env("EDGEGATE_PASSWORD")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_USERNAME)
                .long(ARG_USERNAME)
                .help("Owner username accepted by /api/login in signature mode")
                .env("EDGEGATE_USERNAME"),
        )
        .arg(
            Arg::new(ARG_STORAGE_TYPE)
                .long(ARG_STORAGE_TYPE)
                .help("Storage type: localstorage (password cookie) or redis, upstash, kvrocks, d1 (signed cookie)")
                .env("EDGEGATE_STORAGE_TYPE")
                .default_value("localstorage")
                .value_parser(validator_storage_type()),
        )
        .arg(
            Arg::new(ARG_EXEMPT_PREFIX)
                .long(ARG_EXEMPT_PREFIX)
                .help("Asset path prefix that bypasses authentication (repeatable, replaces the built-in asset list)")
                .long_help(
                    "Asset path prefix that bypasses authentication (repeatable, replaces the built-in asset list). /login, /warning and the session endpoints are always exempt.",
                )
                .env("EDGEGATE_EXEMPT_PREFIXES")
                .action(ArgAction::Append)
                .value_delimiter(','),
        )
        .arg(
            Arg::new(ARG_COOKIE_MAX_AGE)
                .long(ARG_COOKIE_MAX_AGE)
                .help("Auth cookie lifetime in seconds")
                .env("EDGEGATE_COOKIE_MAX_AGE")
                .default_value("604800")
                .value_parser(clap::value_parser!(u64)),
        )
}
