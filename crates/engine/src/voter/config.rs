//! Configuration handed to the Observation Voter with every event.

use std::collections::BTreeSet;

use custody_primitives::{ids::NodeAddress, types::BlockHeight};

/// What the voter needs to know about the world to process an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoterCfg {
    /// The current native height.
    pub height: BlockHeight,

    /// Validators whose signatures count toward consensus.
    pub active_signers: BTreeSet<NodeAddress>,

    /// Number of active signers required for consensus.
    pub threshold: usize,

    /// Blocks after consensus during which a late matching copy is forgiven.
    pub observation_delay_flexibility: u64,

    /// Last observed height of the transaction's chain; zero if unknown.
    pub last_chain_height: BlockHeight,
}

impl VoterCfg {
    /// Returns whether `signers` active signers constitute a consensus.
    ///
    /// An empty active set never reaches consensus.
    pub const fn is_consensus(&self, signers: usize) -> bool {
        self.threshold > 0 && signers >= self.threshold
    }
}
