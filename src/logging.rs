use crate::settings::StencilSettings;
use tracing_subscriber::EnvFilter;

fn default_directive(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "info"
    }
}

/// Initialise logging at `info`, or at `debug` when requested.
///
/// Only debug mode honours `RUST_LOG`, so a stray variable in the user's
/// environment cannot make a release session verbose. Calling this more than
/// once is harmless; the first subscriber stays installed.
pub fn init(debug: bool) {
    let level = default_directive(debug);

    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

pub fn init_from_settings(settings: &StencilSettings) {
    init(settings.debug_logging);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_flag_selects_level() {
        assert_eq!(default_directive(true), "debug");
        assert_eq!(default_directive(false), "info");
    }

    #[test]
    fn repeated_init_is_harmless() {
        init(false);
        init(true);
        tracing::debug!("still logging");
    }
}
