use std::time::Duration;

use focusledger_domain::{LogFormat, LoggingConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Filter variable checked first; `RUST_LOG` is the fallback.
pub const LOG_ENV_VAR: &str = "FOCUSLEDGER_LOG";
const DEFAULT_DIRECTIVE: &str = "info";

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    let installed = match config.format {
        LogFormat::Json => builder.json().with_current_span(false).try_init(),
        LogFormat::Pretty => builder.try_init(),
    };

    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Log the outcome of a command execution with structured fields.
///
/// `command` must be a stable identifier (e.g. `"summary::build_daily"`)
/// and must not carry user data.
#[inline]
pub fn log_command_execution(
    command: &str,
    elapsed: Duration,
    success: bool,
    error_label: Option<&str>,
) {
    let duration_ms = elapsed.as_millis() as u64;

    if success {
        info!(command, duration_ms, "command_execution_success");
    } else {
        warn!(command, duration_ms, error_label = error_label.unwrap_or("unknown"), "command_execution_failure");
    }
}
