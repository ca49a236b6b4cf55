//! I/O error types.

use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A line that is not a valid JSON record.
    #[error("line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// JSON (de)serialization error outside of a line-oriented file.
    #[error("JSON error: {0}")]
    Serde(#[from] serde_json::Error),

    /// JSON that is well formed but not usable.
    #[error("invalid file format: {0}")]
    InvalidFormat(String),

    /// Invalid process configuration.
    #[error("configuration error: {0}")]
    Config(#[from] hcalrecon_core::ConfigError),

    /// Core library error.
    #[error("core error: {0}")]
    Core(#[from] hcalrecon_core::Error),
}
