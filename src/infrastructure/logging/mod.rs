// Logging module - Logging infrastructure
use crate::domain::error::{DevCmdError, DevCmdResult};
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Levels accepted in `global.log_level`
const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Filter directive for our own crate; `--verbose` forces debug.
fn default_directive(log_level: &str, verbose: bool) -> String {
    let level = if verbose {
        "debug"
    } else if LOG_LEVELS.contains(&log_level) {
        log_level
    } else {
        "info"
    };

    format!("warn,devcmd={}", level)
}

/// Build the filter: `RUST_LOG` wins over the configured level.
pub fn build_filter(log_level: &str, verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(log_level, verbose)))
}

/// Initialize logging system. Output goes to stderr so stdout only carries
/// device responses.
pub fn init_logging(log_level: &str, verbose: bool) -> DevCmdResult<()> {
    tracing_subscriber::registry()
        .with(build_filter(log_level, verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(verbose)
                .with_level(true)
                .with_thread_ids(false)
                .with_file(verbose)
                .with_line_number(verbose),
        )
        .try_init()
        .map_err(|e| DevCmdError::Config {
            message: format!("Failed to initialize logging: {}", e),
        })?;

    tracing::debug!("DevCmd logging system initialized");
    Ok(())
}
