//! Storage errors.

use thiserror::Error;

/// Errors that can occur when interacting with a store.
#[derive(Debug, Error)]
pub enum DbError {
    /// The persistent backend failed.
    #[error("sled: {0}")]
    Storage(#[from] sled::Error),

    /// A value could not be encoded or decoded.
    #[error("codec: {0}")]
    Codec(#[from] bincode::Error),
}

/// The result type for store operations.
pub type DbResult<T> = Result<T, DbError>;
