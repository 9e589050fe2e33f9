//! Errors returned by the custody engine.

use custody_db::errors::DbError;
use custody_primitives::{
    asset::{Asset, Coin},
    chain::Chain,
    ids::{Address, PubKey},
    types::{Amount, BlockHeight},
    vault::InvalidStatusTransition,
};
use thiserror::Error;

use crate::{errata::ErrataError, voter::errors::VoterError};

/// Coarse classification of an [`EngineError`], telling the caller how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The message is malformed or refers to unknown entities. Nothing was applied; retrying the
    /// same message fails again.
    InputInvalid,

    /// Not enough funds or value to carry out the request. The caller decides whether to refund.
    InsufficientResource,

    /// A precondition is not met yet (chain halted, fee unknown); the request may succeed later.
    NotYetReady,

    /// Storage failed or an internal invariant was broken.
    InternalInvariant,
}

/// Errors that can occur while processing a message.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The store failed.
    #[error("storage: {0}")]
    Storage(#[from] DbError),

    /// The message failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The vault does not exist.
    #[error("unknown vault {0}")]
    UnknownVault(PubKey),

    /// An observation voter rejected the event.
    #[error("voter: {0}")]
    Voter(#[from] VoterError),

    /// An errata voter rejected the event.
    #[error("errata: {0}")]
    Errata(#[from] ErrataError),

    /// A vault status change would move backwards.
    #[error(transparent)]
    VaultStatus(#[from] InvalidStatusTransition),

    /// The destination is on the outbound blacklist.
    #[error("destination {0} is blacklisted")]
    Blacklisted(Address),

    /// No pool exists to price the asset.
    #[error("no pool for {0}")]
    MissingPool(Asset),

    /// The eligible vaults cannot cover the payment.
    #[error("insufficient funds for {coin}: {remaining} uncovered")]
    InsufficientFunds {
        /// The requested payment.
        coin: Coin,
        /// The amount no vault could cover.
        remaining: Amount,
    },

    /// After fees the payment is worth less than the caller accepts.
    #[error("output {total} below minimum {min_out}")]
    BelowMinimum {
        /// Amount left after fees.
        total: Amount,
        /// Minimum the caller accepts.
        min_out: Amount,
    },

    /// Custody activity on the chain is halted.
    #[error("chain {chain} halted at height {height}")]
    ChainHalted {
        /// The chain.
        chain: Chain,
        /// Height of the halt.
        height: BlockHeight,
    },

    /// No network fee is known for the chain yet.
    #[error("no network fee for {0}")]
    MissingNetworkFee(Chain),
}

impl EngineError {
    /// Returns the error's classification.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Storage(_) => ErrorKind::InternalInvariant,
            EngineError::InvalidInput(_)
            | EngineError::UnknownVault(_)
            | EngineError::Voter(_)
            | EngineError::Errata(_)
            | EngineError::VaultStatus(_)
            | EngineError::Blacklisted(_) => ErrorKind::InputInvalid,
            EngineError::MissingPool(_)
            | EngineError::InsufficientFunds { .. }
            | EngineError::BelowMinimum { .. } => ErrorKind::InsufficientResource,
            EngineError::ChainHalted { .. } | EngineError::MissingNetworkFee(_) => {
                ErrorKind::NotYetReady
            }
        }
    }

    /// Returns whether the error reports an event that was already applied.
    pub const fn is_duplicate(&self) -> bool {
        matches!(
            self,
            EngineError::Voter(VoterError::Duplicate { .. })
                | EngineError::Errata(ErrataError::Duplicate { .. })
        )
    }
}

/// The result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
