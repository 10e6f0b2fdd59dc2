use crate::cli::{actions::Action, commands, dispatch, telemetry};
use anyhow::Result;

/// Parse the command line, set up logging, and build the [`Action`] to run.
///
/// # Errors
///
/// Returns an error if telemetry cannot be initialized or the arguments do
/// not describe a valid gate.
pub fn start() -> Result<Action> {
    let matches = commands::new().get_matches();

    let verbosity = matches
        .get_one::<u8>(commands::logging::ARG_VERBOSITY)
        .copied()
        .unwrap_or_default();

    telemetry::init(commands::logging::level(verbosity))?;

    dispatch::handler(&matches)
}
