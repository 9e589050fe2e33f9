//! The states of the Observation Voter and the records it keeps.

use std::{collections::BTreeSet, fmt};

use custody_primitives::{
    asset::Coin,
    ids::{NodeAddress, PubKey},
    tx::ObservedTx,
    txout::TxOutItem,
    types::BlockHeight,
};
use serde::{Deserialize, Serialize};

/// The lifecycle of an observed external transaction.
///
/// ```text
/// Pending ──► ConsensusReached ──► Finalised ──► Done
///    │               │
///    └───────────────┴──► Reverted
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoterState {
    /// Observations are being collected; no copy has a supermajority yet.
    Pending,

    /// A copy reached a supermajority and the vault has been credited.
    ConsensusReached {
        /// Native height at which consensus was reached.
        consensus_height: BlockHeight,
    },

    /// The transaction is final and has been handed to the downstream handler.
    Finalised {
        /// Native height at which consensus was reached.
        consensus_height: BlockHeight,
        /// Native height at which the transaction became final.
        finalised_height: BlockHeight,
    },

    /// Every outbound produced for the transaction has been observed.
    Done {
        /// Native height at which consensus was reached.
        consensus_height: BlockHeight,
        /// Native height at which the transaction became final.
        finalised_height: BlockHeight,
    },

    /// The transaction was reverted on its chain.
    Reverted {
        /// Native height at which consensus was reached, if it ever was.
        consensus_height: Option<BlockHeight>,
        /// Native height of the revert.
        reverted_height: BlockHeight,
    },
}

impl VoterState {
    /// Height at which consensus was reached, if it was.
    pub const fn consensus_height(&self) -> Option<BlockHeight> {
        match self {
            VoterState::Pending => None,
            VoterState::ConsensusReached { consensus_height }
            | VoterState::Finalised {
                consensus_height, ..
            }
            | VoterState::Done {
                consensus_height, ..
            } => Some(*consensus_height),
            VoterState::Reverted {
                consensus_height, ..
            } => *consensus_height,
        }
    }

    /// Height at which the transaction became final, if it did.
    pub const fn finalised_height(&self) -> Option<BlockHeight> {
        match self {
            VoterState::Finalised {
                finalised_height, ..
            }
            | VoterState::Done {
                finalised_height, ..
            } => Some(*finalised_height),
            _ => None,
        }
    }

    /// Returns whether a copy has reached consensus and the voter was not reverted.
    pub const fn has_consensus(&self) -> bool {
        matches!(
            self,
            VoterState::ConsensusReached { .. }
                | VoterState::Finalised { .. }
                | VoterState::Done { .. }
        )
    }

    /// Returns whether the voter is finalised or done.
    pub const fn is_finalised(&self) -> bool {
        matches!(self, VoterState::Finalised { .. } | VoterState::Done { .. })
    }
}

impl fmt::Display for VoterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoterState::Pending => write!(f, "Pending"),
            VoterState::ConsensusReached { consensus_height } => {
                write!(f, "ConsensusReached at {consensus_height}")
            }
            VoterState::Finalised {
                finalised_height, ..
            } => write!(f, "Finalised at {finalised_height}"),
            VoterState::Done { .. } => write!(f, "Done"),
            VoterState::Reverted {
                reverted_height, ..
            } => write!(f, "Reverted at {reverted_height}"),
        }
    }
}

/// One distinct observed copy and the validators that submitted exactly that copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationBucket {
    /// The observed copy.
    pub tx: ObservedTx,

    /// The validators that submitted it.
    pub signers: BTreeSet<NodeAddress>,
}

/// The credit applied to a vault when consensus was reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultCredit {
    /// The vault credited.
    pub vault: PubKey,

    /// The coins credited.
    pub coins: Vec<Coin>,
}

/// An outbound payment produced for an inbound transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundAction {
    /// The scheduled item.
    pub item: TxOutItem,

    /// The height of the bucket the item sits in.
    pub height: BlockHeight,
}
