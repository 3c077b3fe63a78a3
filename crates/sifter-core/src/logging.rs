//! Structured logging setup
//!
//! `tracing`-based logging with configurable format.  Initialize once at
//! startup; repeated calls are no-ops so embedding hosts and tests can
//! both call it safely.
//!
//! Scan-path events use these correlation fields consistently:
//! `build` (display name), `pattern` (indication text), `cause`
//! (failure-cause name), `elapsed_ms`.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, EnvFilter};

pub use crate::config::LogFormat;
use crate::error::ConfigError;
use crate::Result;

/// Set once logging has been initialized.
static LOGGING_INITIALIZED: OnceLock<bool> = OnceLock::new();

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level filter (trace, debug, info, warn, error); RUST_LOG wins
    /// when set
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Initialize the global tracing subscriber.  Subsequent calls return
/// without touching the already-installed subscriber.
///
/// # Errors
///
/// [`ConfigError::Invalid`] when the level filter does not parse.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    if LOGGING_INITIALIZED.get().is_some() {
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|err| ConfigError::Invalid(format!("invalid log level filter: {err}")))?;

    match config.format {
        LogFormat::Pretty => fmt().with_env_filter(filter).init(),
        LogFormat::Json => fmt().json().with_env_filter(filter).init(),
    }

    let _ = LOGGING_INITIALIZED.set(true);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_info_pretty() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Pretty);
    }

    #[test]
    fn init_is_idempotent() {
        let config = LogConfig::default();
        init_logging(&config).unwrap();
        init_logging(&config).unwrap();
    }
}
