//! Tracing subscriber setup for binaries and integration harnesses embedding the engine.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;
use crate::constants::DEFAULT_LOG_LEVEL;
use crate::error::{CoreError, CoreResult};

/// ## Summary
/// Builds the filter for `level`, honouring `RUST_LOG` when it is set.
///
/// ## Errors
/// Returns `InvalidLogFilter` if neither `RUST_LOG` nor `level` parse as a filter directive.
pub fn build_filter(level: &str) -> CoreResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    EnvFilter::try_new(level).map_err(|e| CoreError::InvalidLogFilter(format!("{level}: {e}")))
}

/// ## Summary
/// Installs the global tracing subscriber using the configured level.
///
/// An invalid level falls back to `info` and is reported once the subscriber is live.
///
/// ## Side Effects
/// Sets the global default subscriber. Calling this twice is a no-op for the second call.
pub fn init_tracing(config: &LoggingConfig) {
    let (filter, rejected) = match build_filter(&config.level) {
        Ok(filter) => (filter, None),
        Err(e) => (EnvFilter::new(DEFAULT_LOG_LEVEL), Some(e)),
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .try_init()
        .is_ok();

    if let Some(e) = rejected {
        tracing::warn!(error = %e, "Invalid log level in config, using {DEFAULT_LOG_LEVEL}");
    }
    if !installed {
        tracing::debug!("Global subscriber already installed");
    }
}
