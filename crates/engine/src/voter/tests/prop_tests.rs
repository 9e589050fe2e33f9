//! Property-based tests for the Observation Voter.

use proptest::prelude::*;

use super::*;
use crate::{
    prop_deterministic, prop_errors_leave_state_unchanged,
    state_machine::StateMachine,
    voter::state::VaultCredit,
};

fn arb_height() -> impl Strategy<Value = BlockHeight> {
    1..1_000u64
}

fn arb_voter_state() -> impl Strategy<Value = VoterState> {
    prop_oneof![
        Just(VoterState::Pending),
        arb_height().prop_map(|consensus_height| VoterState::ConsensusReached { consensus_height }),
        (arb_height(), arb_height()).prop_map(|(consensus_height, finalised_height)| {
            VoterState::Finalised {
                consensus_height,
                finalised_height,
            }
        }),
        (arb_height(), arb_height()).prop_map(|(consensus_height, finalised_height)| {
            VoterState::Done {
                consensus_height,
                finalised_height,
            }
        }),
        (proptest::option::of(arb_height()), arb_height()).prop_map(
            |(consensus_height, reverted_height)| VoterState::Reverted {
                consensus_height,
                reverted_height,
            }
        ),
    ]
}

fn arb_voter_event() -> impl Strategy<Value = VoterEvent> {
    prop_oneof![
        (0..TEST_INACTIVE_IDX + 1, any::<bool>()).prop_map(|(idx, is_final)| {
            let copy = if is_final { final_copy() } else { pending_copy() };
            observe(idx, &copy)
        }),
        arb_height().prop_map(|height| VoterEvent::ChainHeight { height }),
        Just(VoterEvent::RecordCredit {
            credit: VaultCredit {
                vault: test_vault().pub_key,
                coins: test_coins(),
            },
        }),
        any::<u8>().prop_map(|seed| VoterEvent::OutboundObserved { out_hash: txid(seed) }),
        Just(VoterEvent::Revert),
        Just(VoterEvent::MarkDone),
    ]
}

prop_deterministic!(
    ObservationVoter,
    create_sm,
    get_state,
    &test_cfg(),
    arb_voter_state(),
    arb_voter_event()
);

prop_errors_leave_state_unchanged!(
    ObservationVoter,
    create_sm,
    get_state,
    &test_cfg(),
    arb_voter_state(),
    arb_voter_event()
);

proptest! {
    #[test]
    fn consensus_requires_two_thirds_of_active(active in 1usize..12, submitted in 0usize..12) {
        let submitted = submitted.min(active);
        let threshold = custody_primitives::types::supermajority_threshold(active, 2, 3);

        let cfg = VoterCfg {
            height: TEST_HEIGHT,
            active_signers: (0..active).map(custody_test_utils::fixtures::node_address).collect(),
            threshold,
            observation_delay_flexibility: TEST_FLEXIBILITY,
            last_chain_height: 0,
        };

        let copy = final_copy();
        let mut sm = ObservationVoter::new(test_txid());
        for idx in 0..submitted {
            sm.process_event(&cfg, observe(idx, &copy)).expect("observation must be accepted");
        }

        prop_assert_eq!(sm.state().has_consensus(), submitted >= threshold);
    }

    #[test]
    fn consensus_applies_exactly_once(order in Just((0..TEST_ACTIVE).collect::<Vec<_>>()).prop_shuffle()) {
        let cfg = test_cfg();
        let copy = final_copy();
        let mut sm = ObservationVoter::new(test_txid());

        let mut applied = 0;
        for idx in order.iter().chain(order.iter()) {
            if let Ok(output) = sm.process_event(&cfg, observe(*idx, &copy)) {
                applied += output
                    .duties
                    .iter()
                    .filter(|d| matches!(d, crate::voter::duties::VoterDuty::ApplyConsensus { .. }))
                    .count();
            }
        }

        prop_assert_eq!(applied, 1);
    }
}
