//! The duties that need to be performed in response to Observation Voter transitions.

use custody_primitives::{ids::NodeAddress, tx::ObservedTx};

use crate::voter::state::VaultCredit;

/// The duties emitted by an Observation Voter.
///
/// Duties are performed by the ledger, in the order they are emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoterDuty {
    /// Credit the vault (inbound) or settle the outbound (outbound) for the canonical copy.
    ApplyConsensus {
        /// The canonical copy.
        tx: ObservedTx,
    },

    /// Remove the observation points charged to these signers.
    RefundObservationPoints {
        /// Signers whose copy matched the canonical one.
        signers: Vec<NodeAddress>,
    },

    /// Hand the final transaction to the downstream handler.
    DispatchFinalised {
        /// The canonical final copy.
        tx: ObservedTx,
    },

    /// Debit the credit applied on consensus.
    UndoCredit {
        /// The credit to undo.
        credit: VaultCredit,
    },
}
