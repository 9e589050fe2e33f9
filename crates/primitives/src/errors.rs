//! Errors raised while parsing primitive types from their textual forms.

use thiserror::Error;

/// Errors that can occur when parsing primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The chain identifier is not one of the supported chains.
    #[error("unknown chain: {0}")]
    UnknownChain(String),

    /// The asset string is not of the form `CHAIN.SYMBOL`.
    #[error("malformed asset: {0}")]
    MalformedAsset(String),

    /// The transaction id is not a 32-byte hex string.
    #[error("malformed tx id: {0}")]
    MalformedTxId(String),
}

/// The result type for parsing primitives.
pub type ParseResult<T> = Result<T, ParseError>;
