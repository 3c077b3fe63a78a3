//! Error types for sifter-core

use thiserror::Error;

/// Result type alias using the library's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for sifter-core
#[derive(Error, Debug)]
pub enum Error {
    /// Failure-indication pattern errors
    #[error("Pattern error: {0}")]
    Pattern(#[from] PatternError),

    /// Scan engine errors
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    /// Knowledge-base errors
    #[error("Knowledge base error: {0}")]
    Knowledge(#[from] KnowledgeError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Persistence errors reported by a build collaborator
    #[error("Persistence error: {0}")]
    Persistence(String),
}

/// Pattern compilation errors
#[derive(Error, Debug)]
pub enum PatternError {
    /// The pattern text is not a valid regular expression
    #[error("invalid regex '{pattern}': {detail}")]
    InvalidRegex { pattern: String, detail: String },

    /// The pattern is valid but could not be compiled into the bounded
    /// matching automaton (for example, it exceeds the size limits)
    #[error("unsupported pattern '{pattern}': {detail}")]
    Unsupported { pattern: String, detail: String },
}

/// Scan engine errors.
///
/// Per-line and per-file timeouts are *not* errors: the scanner recovers
/// from them in place and logs a warning.  Only faults the scanner cannot
/// classify as a timeout surface here.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The matching engine reported a fault other than an interruption
    #[error("match engine fault: {0}")]
    Engine(String),
}

/// Knowledge-base errors
#[derive(Error, Debug)]
pub enum KnowledgeError {
    /// Underlying database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored failure cause could not be decoded or recompiled
    #[error("stored cause '{name}' is corrupt: {detail}")]
    CorruptCause { name: String, detail: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be parsed
    #[error("parse error: {0}")]
    Parse(String),

    /// A configuration value failed validation
    #[error("invalid value: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_includes_context() {
        let err = Error::from(PatternError::InvalidRegex {
            pattern: "(".to_string(),
            detail: "unclosed group".to_string(),
        });
        let msg = err.to_string();
        assert!(msg.contains("Pattern error"), "got: {msg}");
        assert!(msg.contains("unclosed group"), "got: {msg}");
    }

    #[test]
    fn config_error_converts() {
        let err: Error = ConfigError::Invalid("scan.per_line_timeout_ms must be > 0".into()).into();
        assert!(matches!(err, Error::Config(_)));
    }
}
