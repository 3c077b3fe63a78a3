//! Configuration management
//!
//! Loading and validation of `sifter.toml` configuration files.
//!
//! # Schema Overview
//!
//! - `general`: log level and format
//! - `scan`: per-line and per-file wall-clock budgets
//! - `storage`: knowledge-base database path
//!
//! All sections use `#[serde(default)]` so missing fields fall back to
//! defaults; unknown fields are ignored for forward compatibility.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::scanner::{ScanBudget, DEFAULT_PER_FILE_TIMEOUT, DEFAULT_PER_LINE_TIMEOUT};
use crate::Result;

/// Log format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable pretty format (default for interactive use)
    #[default]
    Pretty,
    /// Machine-parseable JSON lines (for CI/ops)
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Parse(format!(
                "invalid log format: {other} (expected 'pretty' or 'json')"
            ))),
        }
    }
}

/// Complete configuration for the scanning core.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// General settings (logging)
    pub general: GeneralConfig,
    /// Scan budgets
    pub scan: ScanConfig,
    /// Knowledge-base storage settings
    pub storage: StorageConfig,
}

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level filter (trace, debug, info, warn, error); the RUST_LOG
    /// environment variable takes precedence
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

/// Scan budget settings, all wall-clock milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Bound on a single pattern match attempt
    pub per_line_timeout_ms: u64,
    /// Bound on scanning one test action's failed-test list
    pub per_file_timeout_ms: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            per_line_timeout_ms: DEFAULT_PER_LINE_TIMEOUT.as_millis() as u64,
            per_file_timeout_ms: DEFAULT_PER_FILE_TIMEOUT.as_millis() as u64,
        }
    }
}

impl ScanConfig {
    /// The budgets as a [`ScanBudget`].
    #[must_use]
    pub fn budget(&self) -> ScanBudget {
        ScanBudget {
            per_line: Duration::from_millis(self.per_line_timeout_ms),
            per_file: Duration::from_millis(self.per_file_timeout_ms),
        }
    }
}

/// Knowledge-base storage settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite knowledge base; `None` keeps everything
    /// in-process
    pub db_path: Option<PathBuf>,
}

impl Config {
    /// Parse a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] on malformed TOML, [`ConfigError::Invalid`]
    /// on out-of-range values.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file.
    ///
    /// # Errors
    ///
    /// I/O errors reading the file, plus everything
    /// [`Config::from_toml_str`] reports.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Validate cross-field constraints.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.scan.per_line_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "scan.per_line_timeout_ms must be greater than zero".to_string(),
            )
            .into());
        }
        if self.scan.per_file_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "scan.per_file_timeout_ms must be greater than zero".to_string(),
            )
            .into());
        }
        if self.scan.per_file_timeout_ms < self.scan.per_line_timeout_ms {
            return Err(ConfigError::Invalid(
                "scan.per_file_timeout_ms must not be smaller than scan.per_line_timeout_ms"
                    .to_string(),
            )
            .into());
        }
        Ok(())
    }
}
