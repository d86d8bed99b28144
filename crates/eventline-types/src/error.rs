//! Error hierarchy for eventline.

use thiserror::Error;

/// Errors raised by a byte source while the parser pulls from it.
///
/// Malformed stream content never produces one of these; only the
/// underlying reader can fail.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected end of input: needed {needed} bytes, {available} available")]
    UnexpectedEof { needed: usize, available: usize },
}

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file parse error at {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}
