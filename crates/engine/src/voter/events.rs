//! The events that are relevant to the Observation Voter.

use std::fmt;

use custody_primitives::{
    ids::{NodeAddress, TxId},
    tx::ObservedTx,
    types::BlockHeight,
};

use crate::voter::state::VaultCredit;

/// The external events that affect an Observation Voter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoterEvent {
    /// A validator submitted its copy of the transaction.
    Observe {
        /// The submitting validator.
        signer: NodeAddress,
        /// The submitted copy.
        copy: ObservedTx,
    },

    /// The external chain advanced to `height`.
    ChainHeight {
        /// The last observed height of the transaction's chain.
        height: BlockHeight,
    },

    /// The vault was credited on consensus.
    RecordCredit {
        /// The credit applied.
        credit: VaultCredit,
    },

    /// An outbound produced for this transaction was observed on its chain.
    OutboundObserved {
        /// The id of the outbound transaction.
        out_hash: TxId,
    },

    /// A supermajority voted that the transaction was reverted on its chain.
    Revert,

    /// The transaction needs no further processing.
    MarkDone,
}

impl fmt::Display for VoterEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoterEvent::Observe { signer, copy } => {
                write!(f, "Observe from {signer} (final: {})", copy.is_final())
            }
            VoterEvent::ChainHeight { height } => write!(f, "ChainHeight {height}"),
            VoterEvent::RecordCredit { credit } => write!(f, "RecordCredit to {}", credit.vault),
            VoterEvent::OutboundObserved { out_hash } => write!(f, "OutboundObserved {out_hash}"),
            VoterEvent::Revert => write!(f, "Revert"),
            VoterEvent::MarkDone => write!(f, "MarkDone"),
        }
    }
}
