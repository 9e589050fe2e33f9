//! Testing utilities specific to the Observation Voter.

mod prop_tests;

use std::collections::BTreeSet;

use custody_primitives::{
    asset::Coin,
    chain::Chain,
    ids::{NodeAddress, TxId},
    tx::ObservedTx,
    types::{BlockHeight, ONE},
    vault::{Vault, VaultStatus},
};
use custody_test_utils::fixtures::{active_validators, node_address, shared_vault, txid, ObservedTxBuilder};

use crate::voter::{
    config::VoterCfg, events::VoterEvent, machine::ObservationVoter, state::VoterState,
};

// ===== Test Constants =====

/// Native height used as the current block in tests.
pub(super) const TEST_HEIGHT: BlockHeight = 50;
/// Number of active validators in tests.
pub(super) const TEST_ACTIVE: usize = 4;
/// Signers required for consensus among [`TEST_ACTIVE`] validators.
pub(super) const TEST_THRESHOLD: usize = 3;
/// Flexibility window used in tests.
pub(super) const TEST_FLEXIBILITY: u64 = 10;
/// External height the test transaction is included at.
pub(super) const TEST_BLOCK_HEIGHT: BlockHeight = 100;
/// External height at which non-final test copies become final.
pub(super) const TEST_FINALISE_HEIGHT: BlockHeight = 106;
/// Index of a validator that is not part of the active set.
pub(super) const TEST_INACTIVE_IDX: usize = 9;
const _: () = assert!(TEST_INACTIVE_IDX >= TEST_ACTIVE);

// ===== Configuration Helpers =====

/// Creates a test configuration at `height`.
pub(super) fn test_cfg_at(height: BlockHeight) -> VoterCfg {
    VoterCfg {
        height,
        active_signers: (0..TEST_ACTIVE).map(node_address).collect::<BTreeSet<_>>(),
        threshold: TEST_THRESHOLD,
        observation_delay_flexibility: TEST_FLEXIBILITY,
        last_chain_height: 0,
    }
}

/// Creates a test configuration at [`TEST_HEIGHT`].
pub(super) fn test_cfg() -> VoterCfg {
    test_cfg_at(TEST_HEIGHT)
}

// ===== Fixture Helpers =====

/// The id of the transaction under test.
pub(super) fn test_txid() -> TxId {
    txid(0xAA)
}

/// The vault the transaction under test is sent to.
pub(super) fn test_vault() -> Vault {
    shared_vault("asgard", VaultStatus::Active, &active_validators(TEST_ACTIVE))
}

/// The coins carried by the transaction under test.
pub(super) fn test_coins() -> Vec<Coin> {
    vec![Coin::new(Chain::Btc.gas_asset(), ONE)]
}

/// A final copy of the transaction under test.
pub(super) fn final_copy() -> ObservedTx {
    ObservedTxBuilder::inbound(test_txid(), &test_vault(), test_coins())
        .at(TEST_BLOCK_HEIGHT)
        .build()
}

/// A copy of the transaction under test that is not final yet.
pub(super) fn pending_copy() -> ObservedTx {
    ObservedTxBuilder::inbound(test_txid(), &test_vault(), test_coins())
        .at(TEST_BLOCK_HEIGHT)
        .pending_until(TEST_FINALISE_HEIGHT)
        .build()
}

/// An observation of `copy` by the `idx`-th validator.
pub(super) fn observe(idx: usize, copy: &ObservedTx) -> VoterEvent {
    VoterEvent::Observe {
        signer: node_address(idx),
        copy: copy.clone(),
    }
}

/// Signers `0..n` as a sorted list.
pub(super) fn signers(n: usize) -> Vec<NodeAddress> {
    (0..n).map(node_address).collect()
}

// ===== State Machine Helpers =====

/// Creates a voter in `state` without any observation.
pub(super) fn create_sm(state: VoterState) -> ObservationVoter {
    ObservationVoter::with_state(test_txid(), state)
}

/// Gets the state of a voter.
pub(super) const fn get_state(sm: &ObservationVoter) -> &VoterState {
    sm.state()
}

/// Creates a voter that reached consensus on [`pending_copy`] at [`TEST_HEIGHT`].
pub(super) fn consensus_sm() -> ObservationVoter {
    use crate::state_machine::StateMachine;

    let cfg = test_cfg();
    let copy = pending_copy();
    let mut sm = ObservationVoter::new(test_txid());
    for idx in 0..TEST_THRESHOLD {
        sm.process_event(&cfg, observe(idx, &copy))
            .expect("observation must be accepted");
    }

    assert_eq!(
        sm.state(),
        &VoterState::ConsensusReached {
            consensus_height: TEST_HEIGHT
        }
    );
    sm
}

/// Creates a voter that reached consensus and was finalised at [`TEST_HEIGHT`].
pub(super) fn finalised_sm() -> ObservationVoter {
    use crate::state_machine::StateMachine;

    let cfg = test_cfg();
    let copy = final_copy();
    let mut sm = ObservationVoter::new(test_txid());
    for idx in 0..TEST_THRESHOLD {
        sm.process_event(&cfg, observe(idx, &copy))
            .expect("observation must be accepted");
    }

    assert!(sm.state().is_finalised());
    sm
}
