use super::{GateConfig, RequestContext};

/// Canonical-domain location for requests that arrived on a platform-assigned
/// hostname.
///
/// Returns `None` when no target is configured, the hostname does not carry
/// the platform suffix, or the hostname already is the target.
#[must_use]
pub fn redirect_target(config: &GateConfig, ctx: &RequestContext) -> Option<String> {
    let target = config.redirect_target()?;
    let suffix = config.platform_suffix();

    if suffix.is_empty() || !ctx.hostname.ends_with(suffix) || ctx.hostname == target {
        return None;
    }

    Some(format!("https://{target}{}", ctx.path_and_query()))
}
