use clap::{builder::ValueParser, Arg, ArgAction, Command};
use tracing::Level;

pub const ARG_VERBOSITY: &str = "verbosity";

/// Level names in verbosity order; the index is the `-v` count.
const LEVELS: [(&str, Level); 5] = [
    ("error", Level::ERROR),
    ("warn", Level::WARN),
    ("info", Level::INFO),
    ("debug", Level::DEBUG),
    ("trace", Level::TRACE),
];

/// Accepts a level name or its index, for `EDGEGATE_LOG_LEVEL`.
#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |value: &str| -> std::result::Result<u8, String> {
        let value = value.trim();
        let index = value.parse::<usize>().ok().or_else(|| {
            LEVELS
                .iter()
                .position(|(name, _)| name.eq_ignore_ascii_case(value))
        });

        index
            .filter(|index| *index < LEVELS.len())
            .and_then(|index| u8::try_from(index).ok())
            .ok_or_else(|| {
                format!("invalid log level: {value} (expected error, warn, info, debug or trace)")
            })
    })
}

/// Tracing level for a verbosity count; `None` keeps the default (error).
#[must_use]
pub fn level(verbosity: u8) -> Option<Level> {
    match verbosity {
        0 => None,
        count => LEVELS
            .get(usize::from(count))
            .map_or(Some(Level::TRACE), |(_, level)| Some(*level)),
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Log more: -v warn, -vv info, -vvv debug, -vvvv trace (errors are always logged)")
            .env("EDGEGATE_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}
