// ABOUTME: Shared logging setup for the wick binary and its test harnesses
// ABOUTME: Two functions: init() for stderr at INFO, init_with_debug() for the --debug flag

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Standard logging to stderr. Default: INFO level, RUST_LOG override.
pub fn init() {
    init_with_debug(false);
}

/// Logging to stderr at DEBUG when `debug` is set, INFO otherwise.
/// RUST_LOG directives are applied on top of the chosen level.
pub fn init_with_debug(debug: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(filter_for(debug))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Build the env filter used by [`init_with_debug`].
fn filter_for(debug: bool) -> EnvFilter {
    EnvFilter::from_default_env().add_directive(default_level(debug).into())
}

fn default_level(debug: bool) -> Level {
    if debug {
        Level::DEBUG
    } else {
        Level::INFO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exports_init() {
        let _ = super::init as fn();
    }

    #[test]
    fn exports_init_with_debug() {
        let _ = super::init_with_debug as fn(bool);
    }

    #[test]
    fn test_default_level_follows_debug_flag() {
        assert_eq!(default_level(true), Level::DEBUG);
        assert_eq!(default_level(false), Level::INFO);
    }

    #[test]
    fn test_filter_includes_default_level() {
        let rendered = filter_for(true).to_string();
        assert!(rendered.contains("debug"), "filter was {rendered}");
    }
}
