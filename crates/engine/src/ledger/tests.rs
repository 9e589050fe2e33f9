use custody_primitives::{
    chain::Chain,
    memo::Memo,
    tx::ObservedTx,
    txout::TxOutItem,
    types::{Amount, ONE},
    validator::NodeStatus,
    vault::{Vault, VaultStatus},
};
use custody_test_utils::{
    arbitrary_generator::{arb_amount, arb_txid, ArbitraryGenerator},
    fixtures::{
        node_address, per_node_vault, shared_vault, txid, user_address, vault_address,
        ObservedTxBuilder,
    },
};
use proptest::prelude::*;

use super::*;
use crate::{
    handler::{HandlerResult, NoopHandler},
    testing::world::{btc, TestWorld},
    voter::state::VoterState,
};

const HEIGHT: BlockHeight = 10;

/// Protocol fee of one outbound in BTC under the fixture pool.
const FEE_BTC: Amount = 20_000;

/// Pays every coin of an inbound back to its sender.
#[derive(Debug)]
struct PayBack;

impl InboundHandler for PayBack {
    fn handle(&self, ctx: &mut CustodyCtx<'_>, tx: &ObservedTx, _memo: &Memo) -> HandlerResult<()> {
        for coin in &tx.tx.coins {
            let item = TxOutItem::new(
                tx.tx.chain,
                tx.tx.from_address.clone(),
                coin.clone(),
                tx.tx.id.clone(),
            );
            ctx.schedule(item, 0)?;
        }

        Ok(())
    }
}

fn submit_all(
    world: &mut TestWorld,
    height: BlockHeight,
    signers: std::ops::Range<usize>,
    copy: &ObservedTx,
    handler: &dyn InboundHandler,
) {
    for idx in signers {
        let outcome = world
            .ctx(height)
            .submit_observation(&node_address(idx), copy.clone(), handler)
            .expect("must submit");
        assert_eq!(outcome, SubmitOutcome::Accepted);
    }
}

fn state(world: &TestWorld, tx_id: &TxId) -> VoterState {
    world
        .store
        .voter(tx_id)
        .expect("must read")
        .expect("voter must exist")
        .state()
        .clone()
}

fn btc_balance(world: &TestWorld, vault: &Vault) -> Amount {
    world.vault(vault).balance(&Chain::Btc.gas_asset())
}

#[test]
fn test_consensus_credits_once() {
    let mut world = TestWorld::new(4);
    let vault = world.add_shared_vault("asgard", VaultStatus::Active, &[]);
    let copy = ObservedTxBuilder::inbound(txid(1), &vault, vec![btc(ONE)]).build();

    submit_all(&mut world, HEIGHT, 0..2, &copy, &NoopHandler);
    assert_eq!(state(&world, &txid(1)), VoterState::Pending);
    assert_eq!(btc_balance(&world, &vault), 0);

    submit_all(&mut world, HEIGHT, 2..4, &copy, &NoopHandler);
    assert_eq!(btc_balance(&world, &vault), ONE);
    assert_eq!(world.vault(&vault).inbound_tx_count, 1);
    assert_eq!(
        state(&world, &txid(1)),
        VoterState::Done {
            consensus_height: HEIGHT,
            finalised_height: HEIGHT,
        }
    );

    // every signer matched the canonical copy in time
    for idx in 0..4 {
        let validator = world
            .store
            .validator(&node_address(idx))
            .expect("must read")
            .expect("must exist");
        assert_eq!(validator.slash_points.observation, 0);
    }

    let credits = world
        .events
        .iter()
        .filter(|e| matches!(e, CustodyEvent::PendingLiquidity { .. }))
        .count();
    assert_eq!(credits, 1);
    assert_eq!(
        world.store.consensus_at(HEIGHT).expect("must read"),
        vec![txid(1)]
    );
}

#[test]
fn test_dropped_submissions() {
    let mut world = TestWorld::new(4);
    let vault = world.add_shared_vault("asgard", VaultStatus::Active, &[]);
    let retired = world.add_shared_vault("retired", VaultStatus::Inactive, &[]);
    let unknown = shared_vault("ghost", VaultStatus::Active, &world.validators);

    let copy = ObservedTxBuilder::inbound(txid(1), &vault, vec![btc(ONE)]).build();
    let outcome = world
        .ctx(HEIGHT)
        .submit_observation(&node_address(9), copy, &NoopHandler)
        .expect("must submit");
    assert_eq!(outcome, SubmitOutcome::Ignored(IgnoreReason::UnknownSigner));

    let copy = ObservedTxBuilder::inbound(txid(2), &unknown, vec![btc(ONE)]).build();
    let outcome = world
        .ctx(HEIGHT)
        .submit_observation(&node_address(0), copy, &NoopHandler)
        .expect("must submit");
    assert_eq!(outcome, SubmitOutcome::Ignored(IgnoreReason::UnknownVault));

    let copy = ObservedTxBuilder::inbound(txid(3), &retired, vec![btc(ONE)]).build();
    let outcome = world
        .ctx(HEIGHT)
        .submit_observation(&node_address(0), copy, &NoopHandler)
        .expect("must submit");
    assert_eq!(outcome, SubmitOutcome::Ignored(IgnoreReason::InactiveVault));

    let malformed = ObservedTxBuilder::inbound(txid(4), &vault, Vec::new()).build();
    let err = world
        .ctx(HEIGHT)
        .submit_observation(&node_address(0), malformed, &NoopHandler)
        .expect_err("must reject");
    assert!(matches!(err, EngineError::InvalidInput(_)));

    for id in 1..=4 {
        assert!(world.store.voter(&txid(id)).expect("must read").is_none());
    }
    let validator = world
        .store
        .validator(&node_address(0))
        .expect("must read")
        .expect("must exist");
    assert_eq!(validator.slash_points.observation, 0);
}

#[test]
fn test_only_active_signers_are_charged_for_observing() {
    let mut world = TestWorld::new(4);
    let vault = world.add_shared_vault("asgard", VaultStatus::Active, &[]);
    let mut standby = world.validators[3].clone();
    standby.status = NodeStatus::Standby;
    world.store.put_validator(&standby).expect("must store");

    let copy = ObservedTxBuilder::inbound(txid(1), &vault, vec![btc(ONE)]).build();
    for idx in [3, 0] {
        let outcome = world
            .ctx(HEIGHT)
            .submit_observation(&node_address(idx), copy.clone(), &NoopHandler)
            .expect("must submit");
        assert_eq!(outcome, SubmitOutcome::Accepted);
    }

    let points = |world: &TestWorld, idx| {
        world
            .store
            .validator(&node_address(idx))
            .expect("must read")
            .expect("must exist")
            .slash_points
            .observation
    };
    assert_eq!(points(&world, 3), 0);
    assert_eq!(points(&world, 0), world.params.observe_slash_points);
}

#[test]
fn test_resubmission_and_conflicting_copies() {
    let mut world = TestWorld::new(4);
    let vault = world.add_shared_vault("asgard", VaultStatus::Active, &[]);
    let copy = ObservedTxBuilder::inbound(txid(1), &vault, vec![btc(ONE)]).build();
    let signer = node_address(0);

    let first = world
        .ctx(HEIGHT)
        .submit_observation(&signer, copy.clone(), &NoopHandler)
        .expect("must submit");
    let again = world
        .ctx(HEIGHT)
        .submit_observation(&signer, copy.clone(), &NoopHandler)
        .expect("must submit");
    assert_eq!(first, SubmitOutcome::Accepted);
    assert_eq!(again, SubmitOutcome::AlreadyRecorded);

    let validator = world
        .store
        .validator(&signer)
        .expect("must read")
        .expect("must exist");
    assert_eq!(
        validator.slash_points.observation,
        world.params.observe_slash_points
    );

    let other = ObservedTxBuilder::inbound(txid(1), &vault, vec![btc(2 * ONE)]).build();
    let outcome = world
        .ctx(HEIGHT)
        .submit_observation(&signer, other, &NoopHandler)
        .expect("must submit");
    assert_eq!(outcome, SubmitOutcome::ConflictingCopy);
}

#[test]
fn test_chain_depth_finalises_and_dispatches() {
    let mut world = TestWorld::new(4);
    let vault = world.add_shared_vault("asgard", VaultStatus::Active, &[]);
    // one BTC needs a single confirmation
    let copy = ObservedTxBuilder::inbound(txid(1), &vault, vec![btc(ONE)])
        .pending_until(106)
        .build();

    submit_all(&mut world, HEIGHT, 0..3, &copy, &PayBack);
    assert_eq!(
        state(&world, &txid(1)),
        VoterState::ConsensusReached {
            consensus_height: HEIGHT,
        }
    );
    assert_eq!(
        world.store.pending_finalisation(Chain::Btc).expect("must read"),
        vec![txid(1)]
    );

    world
        .ctx(HEIGHT + 1)
        .observe_chain_height(Chain::Btc, 100, &PayBack)
        .expect("must observe");
    assert!(!state(&world, &txid(1)).is_finalised());

    world
        .ctx(HEIGHT + 2)
        .observe_chain_height(Chain::Btc, 101, &PayBack)
        .expect("must observe");
    assert_eq!(
        state(&world, &txid(1)),
        VoterState::Finalised {
            consensus_height: HEIGHT,
            finalised_height: HEIGHT + 2,
        }
    );
    assert!(world
        .store
        .pending_finalisation(Chain::Btc)
        .expect("must read")
        .is_empty());

    let voter = world
        .store
        .voter(&txid(1))
        .expect("must read")
        .expect("must exist");
    let [action] = voter.actions() else {
        panic!("expected one payout");
    };
    assert_eq!(action.item.to_address, user_address(Chain::Btc));
    assert_eq!(action.item.coin, btc(ONE - FEE_BTC));

    let queued = world.store.txout(action.height).expect("must read");
    assert_eq!(queued.items, vec![action.item.clone()]);
}

#[test]
fn test_unparseable_memo_is_refunded() {
    let mut world = TestWorld::new(4);
    let vault = world.add_shared_vault("asgard", VaultStatus::Active, &[]);
    let copy = ObservedTxBuilder::inbound(txid(1), &vault, vec![btc(ONE)])
        .memo("NONSENSE:1")
        .build();

    submit_all(&mut world, HEIGHT, 0..3, &copy, &PayBack);

    let voter = world
        .store
        .voter(&txid(1))
        .expect("must read")
        .expect("must exist");
    let [action] = voter.actions() else {
        panic!("expected one refund");
    };
    assert_eq!(action.item.memo, Memo::refund(&txid(1)));
    assert_eq!(action.item.to_address, user_address(Chain::Btc));
    assert!(voter.state().is_finalised());
}

#[test]
fn test_errata_reverts_credit() {
    let mut world = TestWorld::new(4);
    let vault = world.add_shared_vault("asgard", VaultStatus::Active, &[]);
    let copy = ObservedTxBuilder::inbound(txid(1), &vault, vec![btc(ONE)])
        .pending_until(106)
        .build();
    submit_all(&mut world, HEIGHT, 0..3, &copy, &NoopHandler);
    assert_eq!(btc_balance(&world, &vault), ONE);

    for idx in 0..2 {
        world
            .ctx(HEIGHT + 1)
            .submit_errata(&node_address(idx), &txid(1), &NoopHandler)
            .expect("must vote");
    }
    assert_eq!(btc_balance(&world, &vault), ONE);

    world
        .ctx(HEIGHT + 1)
        .submit_errata(&node_address(2), &txid(1), &NoopHandler)
        .expect("must vote");
    assert_eq!(btc_balance(&world, &vault), 0);
    assert_eq!(
        state(&world, &txid(1)),
        VoterState::Reverted {
            consensus_height: Some(HEIGHT),
            reverted_height: HEIGHT + 1,
        }
    );
    assert!(world
        .store
        .pending_finalisation(Chain::Btc)
        .expect("must read")
        .is_empty());
    assert!(world.events.contains(&CustodyEvent::Reverted {
        tx_id: txid(1),
        height: HEIGHT + 1,
    }));

    let err = world
        .ctx(HEIGHT + 2)
        .submit_errata(&node_address(0), &txid(1), &NoopHandler)
        .expect_err("must be a duplicate");
    assert!(err.is_duplicate());
}

#[test]
fn test_errata_for_unseen_tx_is_rejected() {
    let mut world = TestWorld::new(4);
    let unseen = ArbitraryGenerator::new().txid();

    let err = world
        .ctx(HEIGHT)
        .submit_errata(&node_address(0), &unseen, &NoopHandler)
        .expect_err("must reject");
    assert!(matches!(err, EngineError::InvalidInput(_)));
    assert!(world.store.errata_voter(&unseen).expect("must read").is_none());
}

#[test]
fn test_observed_outbound_settles_payment() {
    let mut world = TestWorld::new(4);
    let vault = world.add_shared_vault("asgard", VaultStatus::Active, &[btc(2 * ONE)]);
    let inbound = ObservedTxBuilder::inbound(txid(1), &vault, vec![btc(ONE)]).build();
    submit_all(&mut world, HEIGHT, 0..3, &inbound, &PayBack);

    let action = world
        .store
        .voter(&txid(1))
        .expect("must read")
        .expect("must exist")
        .actions()[0]
        .clone();

    let gas = btc(5_000);
    let outbound = ObservedTxBuilder::outbound(
        txid(2),
        &vault,
        user_address(Chain::Btc),
        vec![action.item.coin.clone()],
    )
    .memo(Memo::outbound(&txid(1)))
    .gas(vec![gas.clone()])
    .build();
    for idx in 0..3 {
        world
            .ctx(HEIGHT + 1)
            .submit_outbound_observation(&node_address(idx), outbound.clone(), &NoopHandler)
            .expect("must submit");
    }

    let queued = world.store.txout(action.height).expect("must read");
    assert_eq!(queued.items[0].out_hash, Some(txid(2)));
    assert_eq!(
        btc_balance(&world, &vault),
        3 * ONE - action.item.coin.amount - gas.amount
    );
    assert!(matches!(state(&world, &txid(1)), VoterState::Done { .. }));
    assert!(world.events.contains(&CustodyEvent::OutboundObserved {
        tx_id: txid(2),
        vault: vault.pub_key.clone(),
        authorized: true,
    }));
}

#[test]
fn test_unauthorized_outbound_slashes_vault() {
    let mut world = TestWorld::new(4);
    let vault = world.add_shared_vault("asgard", VaultStatus::Active, &[btc(2 * ONE)]);
    let outbound =
        ObservedTxBuilder::outbound(txid(3), &vault, user_address(Chain::Btc), vec![btc(ONE)])
            .memo(Memo::outbound(&txid(9)))
            .build();

    for idx in 0..3 {
        world
            .ctx(HEIGHT)
            .submit_outbound_observation(&node_address(idx), outbound.clone(), &NoopHandler)
            .expect("must submit");
    }

    let stored = world.vault(&vault);
    assert_eq!(stored.balance(&Chain::Btc.gas_asset()), ONE);
    assert!(stored.frozen);
    assert_eq!(
        world.store.chain_halt(Chain::Btc).expect("must read"),
        Some(HEIGHT)
    );
    assert!(world
        .events
        .iter()
        .any(|e| matches!(e, CustodyEvent::BondSlashed { .. })));
    assert!(world.events.contains(&CustodyEvent::OutboundObserved {
        tx_id: txid(3),
        vault: vault.pub_key,
        authorized: false,
    }));
}

#[test]
fn test_per_node_vault_credited_only_by_funding() {
    let mut world = TestWorld::new(4);
    world.add_shared_vault("asgard", VaultStatus::Active, &[btc(10 * ONE)]);
    let mut ygg = per_node_vault(&world.validators[0]);
    ygg.append_pending_height(HEIGHT - 5);
    world.store.put_vault(&ygg).expect("must store");

    let swap = ObservedTxBuilder::inbound(txid(1), &ygg, vec![btc(ONE)]).build();
    submit_all(&mut world, HEIGHT, 0..3, &swap, &NoopHandler);
    assert_eq!(btc_balance(&world, &ygg), 0);

    let funding = ObservedTxBuilder::inbound(txid(2), &ygg, vec![btc(ONE)])
        .from(vault_address("asgard", Chain::Btc))
        .memo(Memo::yggdrasil_fund(HEIGHT - 5))
        .build();
    submit_all(&mut world, HEIGHT, 0..3, &funding, &NoopHandler);

    let stored = world.vault(&ygg);
    assert_eq!(stored.balance(&Chain::Btc.gas_asset()), ONE);
    assert!(stored.pending_tx_block_heights().is_empty());
    assert_eq!(stored.inbound_tx_count, 1);
}

proptest! {
    #[test]
    fn consensus_credits_the_observed_amount_once(
        id in arb_txid(),
        amount in arb_amount(50),
        late in 0usize..=1,
    ) {
        let mut world = TestWorld::new(4);
        let vault = world.add_shared_vault("asgard", VaultStatus::Active, &[]);
        let copy = ObservedTxBuilder::inbound(id.clone(), &vault, vec![btc(amount)]).build();

        submit_all(&mut world, HEIGHT, 0..3 + late, &copy, &NoopHandler);

        prop_assert_eq!(btc_balance(&world, &vault), amount);
        prop_assert_eq!(world.vault(&vault).inbound_tx_count, 1);
        prop_assert!(state(&world, &id).is_finalised());
    }
}
