//! Error types for hcalrecon-core.

use thiserror::Error;

/// Result type alias for hcalrecon operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for hcalrecon operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Requested hit collection is not on the event.
    #[error("no hit collection '{collection}' from pass '{pass}' in event {event}")]
    MissingCollection {
        event: u64,
        collection: String,
        pass: String,
    },

    /// A product with this name was already added to the event.
    #[error("product '{0}' already present in event")]
    DuplicateProduct(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Faults found while validating a component configuration.
///
/// These are raised once, when a component is constructed, and are fatal to
/// that component.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A count or threshold that must not be negative.
    #[error("parameter '{name}' must not be negative (got {value})")]
    Negative { name: String, value: f64 },

    /// A parameter that must be strictly positive.
    #[error("parameter '{name}' must be positive (got {value})")]
    NotPositive { name: String, value: f64 },

    /// A fraction outside of [0, 1].
    #[error("parameter '{name}' must lie in [0, 1] (got {value})")]
    FractionOutOfRange { name: String, value: f64 },

    /// Section name that is not one of Back, Top, Bottom, Left, Right.
    #[error("unknown Hcal section '{0}'")]
    UnknownSection(String),

    /// Parameter present but of the wrong type.
    #[error("parameter '{name}' should be {expected}")]
    WrongType { name: String, expected: &'static str },

    /// Two mutually exclusive parameters were both given.
    #[error("parameters '{first}' and '{second}' cannot both be set")]
    Conflicting { first: String, second: String },

    /// Two-stage thresholds in the wrong order.
    #[error("look threshold {look} exceeds accept threshold {accept}")]
    LookAboveAccept { look: u32, accept: u32 },

    /// Producer class that this crate does not provide.
    #[error("unknown producer class '{0}'")]
    UnknownClass(String),
}
