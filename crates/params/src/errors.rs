//! Errors for the protocol parameters.

use thiserror::Error;

/// Error while loading or validating protocol parameters.
#[derive(Debug, Error)]
pub enum ParamsError {
    /// The configuration file could not be read.
    #[error("could not read params: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration is not valid TOML for the expected schema.
    #[error("could not parse params: {0}")]
    Toml(#[from] toml::de::Error),

    /// A parameter has a value that the protocol cannot work with.
    #[error("invalid value for {key}: {reason}")]
    Invalid {
        /// The offending parameter.
        key: &'static str,
        /// Why the value is invalid.
        reason: &'static str,
    },
}

/// The result type for parameter operations.
pub type ParamsResult<T> = Result<T, ParamsError>;
