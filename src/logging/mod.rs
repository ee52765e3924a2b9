//! Logging setup
//!
//! Installs a `tracing-subscriber` fmt subscriber. `RUST_LOG` wins over the
//! configured level when it is set.

use tracing::{debug, error, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{Error, ErrorCategory, Result};

/// Install the global subscriber
///
/// Fails if the filter directive is malformed or a subscriber is already set.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(&config.level)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Full => builder.try_init(),
    };

    installed.map_err(|e| Error::Config(format!("Failed to install logger: {}", e)))
}

fn build_filter(level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level)
        .map_err(|e| Error::Config(format!("Invalid log level '{}': {}", level, e)))
}

/// Log a failed request at a level that matches how bad it is
///
/// Player mistakes are routine and go to debug; store and internal failures
/// are what an operator needs to see.
pub fn log_error(context: &str, err: &Error) {
    match err.category() {
        ErrorCategory::Gaming | ErrorCategory::Validation => {
            debug!(context, error = %err, "Request rejected");
        }
        ErrorCategory::Storage | ErrorCategory::Configuration => {
            warn!(context, error = %err, category = ?err.category(), "Request failed");
        }
        ErrorCategory::Internal => {
            error!(context, error = %err, "Internal error");
        }
    }
}
