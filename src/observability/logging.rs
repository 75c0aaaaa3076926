//! `tracing` subscriber setup.
//!
//! Logs go to stderr so they never mix with report output on stdout.

use tracing_subscriber::{fmt, EnvFilter};

/// Overrides the verbosity flags when set, e.g. `TEST_ANALYZER_LOG=test_analyzer=trace`.
pub const LOG_ENV_VAR: &str = "TEST_ANALYZER_LOG";

/// Level for a `-v` count: errors only, then info, then debug.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "error",
        1 => "info",
        _ => "debug",
    }
}

/// Install the global subscriber. Safe to call more than once; later calls are ignored.
pub fn init_logging(verbosity: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbosity > 1)
        .without_time()
        .try_init();
}
