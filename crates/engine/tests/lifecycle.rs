//! End-to-end runs of the custody core through [`Engine`].

use custody_common::logging::{self, LoggerConfig};
use custody_db::inmemory::InMemoryStore;
use custody_engine::prelude::*;
use custody_params::prelude::{MimirOverrides, ParamKey, ProtocolParams};
use custody_primitives::{
    asset::Coin,
    chain::Chain,
    memo::Memo,
    network_fee::NetworkFee,
    pool::Pool,
    tx::ObservedTx,
    txout::TxOutItem,
    types::{Amount, BlockHeight, ONE},
    vault::{Vault, VaultStatus},
};
use custody_test_utils::fixtures::{
    active_validators, node_address, shared_vault, txid, user_address, ObservedTxBuilder,
};

const HEIGHT: BlockHeight = 100;

fn btc(amount: Amount) -> Coin {
    Coin::new(Chain::Btc.gas_asset(), amount)
}

/// Pays every coin of a finalised inbound back to its sender.
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

/// An engine with four validators, a BTC pool and fee, and one shared vault per entry of
/// `vaults`.
fn setup(vaults: &[(&str, Amount)]) -> (Engine<InMemoryStore>, Vec<Vault>) {
    logging::init(LoggerConfig::with_base_name("custody-tests"));

    let mut engine = Engine::new(InMemoryStore::new(), ProtocolParams::default())
        .with_handler(Box::new(PayBack));
    engine.begin_block(HEIGHT);

    let validators = active_validators(4);
    for validator in &validators {
        engine.upsert_validator(validator).expect("must add validator");
    }
    engine
        .set_pool(&Pool::new(Chain::Btc.gas_asset(), 100_000 * ONE, 1_000 * ONE))
        .expect("must add pool");
    engine
        .set_network_fee(&NetworkFee::new(Chain::Btc, 250, 20))
        .expect("must add fee");

    let vaults = vaults
        .iter()
        .map(|(name, amount)| {
            let mut vault = shared_vault(name, VaultStatus::Active, &validators);
            vault.add_funds(&[btc(*amount)]);
            engine.insert_vault(&vault).expect("must add vault");
            vault
        })
        .collect();
    engine.drain_events();

    (engine, vaults)
}

fn btc_balance(engine: &Engine<InMemoryStore>, vault: &Vault) -> Amount {
    engine
        .vault(&vault.pub_key)
        .expect("must read")
        .expect("vault must exist")
        .balance(&Chain::Btc.gas_asset())
}

#[test]
fn test_inbound_is_credited_paid_out_and_settled() {
    let (mut engine, vaults) = setup(&[("asgard", 2 * ONE)]);
    let vault = &vaults[0];
    let copy = ObservedTxBuilder::inbound(txid(1), vault, vec![btc(ONE)]).build();

    for idx in 0..4 {
        engine
            .submit_observation(&node_address(idx), copy.clone())
            .expect("must submit");
        if idx == 1 {
            assert_eq!(
                engine.observation_state(&txid(1)).expect("must read"),
                Some(VoterState::Pending)
            );
            assert_eq!(btc_balance(&engine, vault), 2 * ONE);
        }
    }
    assert_eq!(btc_balance(&engine, vault), 3 * ONE);

    let events = engine.drain_events();
    let credits = events
        .iter()
        .filter(|e| matches!(e, CustodyEvent::PendingLiquidity { .. }))
        .count();
    assert_eq!(credits, 1);

    let (height, item) = events
        .iter()
        .find_map(|e| match e {
            CustodyEvent::OutboundScheduled { height, item } => Some((*height, item.clone())),
            _ => None,
        })
        .expect("payout must be scheduled");
    assert!(height > HEIGHT);
    assert_eq!(item.vault_pub_key.as_ref(), Some(&vault.pub_key));
    assert_eq!(item.coin.amount + item.fee, ONE);

    let gas = btc(5_000);
    let outbound = ObservedTxBuilder::outbound(
        txid(2),
        vault,
        user_address(Chain::Btc),
        vec![item.coin.clone()],
    )
    .memo(Memo::outbound(&txid(1)))
    .gas(vec![gas.clone()])
    .build();
    engine.begin_block(height);
    for idx in 0..3 {
        engine
            .submit_outbound_observation(&node_address(idx), outbound.clone())
            .expect("must submit");
    }

    // everything the vault received went out as payment, gas or fee
    assert_eq!(
        btc_balance(&engine, vault),
        2 * ONE + item.fee - gas.amount
    );
    assert!(matches!(
        engine.observation_state(&txid(1)).expect("must read"),
        Some(VoterState::Done { .. })
    ));
    let queued = engine.scheduled_outbound(height).expect("must read");
    assert_eq!(queued.items[0].out_hash, Some(txid(2)));

    for idx in 0..4 {
        let points = engine
            .validator_slash_points(&node_address(idx))
            .expect("must read")
            .expect("validator must exist");
        assert_eq!(points.observation, 0);
    }
}

#[test]
fn test_large_outbound_is_split_across_vaults() {
    let (mut engine, vaults) = setup(&[("vault-a", 4 * ONE), ("vault-b", 7 * ONE)]);

    let item = TxOutItem::new(
        Chain::Btc,
        user_address(Chain::Btc),
        btc(10 * ONE),
        txid(7),
    );
    let scheduled = engine.schedule(item, 0).expect("must schedule");

    assert_eq!(scheduled.items.len(), 2);
    let gross = scheduled
        .items
        .iter()
        .fold(0, |acc: Amount, i| acc + i.coin.amount + i.fee);
    assert_eq!(gross, 10 * ONE);

    for leg in &scheduled.items {
        let vault = vaults
            .iter()
            .find(|v| Some(&v.pub_key) == leg.vault_pub_key.as_ref())
            .expect("leg must name a fixture vault");
        assert!(leg.coin.amount + leg.fee <= vault.balance(&Chain::Btc.gas_asset()));
    }
}

#[test]
fn test_unsigned_outbound_moves_after_signing_window() {
    let (mut engine, _vaults) = setup(&[("vault-a", 2 * ONE), ("vault-b", 2 * ONE)]);

    let item = TxOutItem::new(Chain::Btc, user_address(Chain::Btc), btc(ONE), txid(7));
    let scheduled = engine.schedule(item, 0).expect("must schedule");
    let [original] = scheduled.items.as_slice() else {
        panic!("expected a single leg");
    };
    engine.drain_events();

    let deadline = scheduled.height + engine.params().signing_transaction_period;
    engine.begin_block(deadline);
    engine.end_block().expect("must end block");

    let events = engine.drain_events();
    let reassigned = events
        .iter()
        .find_map(|e| match e {
            CustodyEvent::OutboundReassigned {
                from_vault,
                to_vault,
                ..
            } => Some((from_vault.clone(), to_vault.clone())),
            _ => None,
        })
        .expect("item must be reassigned");
    assert_eq!(Some(&reassigned.0), original.vault_pub_key.as_ref());
    assert_ne!(reassigned.0, reassigned.1);

    let old = engine.scheduled_outbound(scheduled.height).expect("must read");
    assert_eq!(old.items[0].superseded_at, Some(deadline));
    let new = engine.scheduled_outbound(deadline).expect("must read");
    assert_eq!(new.items.len(), 1);
    assert_eq!(new.items[0].vault_pub_key, Some(reassigned.1));

    for idx in 0..4 {
        let points = engine
            .validator_slash_points(&node_address(idx))
            .expect("must read")
            .expect("validator must exist");
        assert!(points.signing > 0);
    }
}

#[test]
fn test_slashed_bond_is_fully_accounted() {
    let (mut engine, vaults) = setup(&[("asgard", 10 * ONE)]);

    let burned = engine
        .handle_double_sign(&DoubleSignEvidence {
            node: node_address(0),
            height: HEIGHT - 1,
        })
        .expect("must slash");
    assert!(burned > 0);
    assert_eq!(engine.reserve().expect("must read"), burned);

    let reserve_before = engine.reserve().expect("must read");
    let slash = engine
        .slash_vault(&vaults[0].pub_key, &[btc(ONE / 10)])
        .expect("must slash");
    assert!(slash.slashed > 0);
    assert_eq!(slash.slashed, slash.pool_credit + slash.reserve_credit);
    assert_eq!(
        engine.reserve().expect("must read") - reserve_before,
        slash.reserve_credit
    );

    let bonds: Amount = (0..4)
        .map(|idx| {
            engine
                .store()
                .validator(&node_address(idx))
                .expect("must read")
                .expect("validator must exist")
                .bond
        })
        .sum();
    let initial: Amount = active_validators(4).iter().map(|v| v.bond).sum();
    assert_eq!(initial - bonds, burned + slash.slashed);
}

#[test]
fn test_failed_operation_leaves_no_trace() {
    let (mut engine, _vaults) = setup(&[("asgard", 2 * ONE)]);
    let version = engine.store().version();

    let item = TxOutItem::new(Chain::Btc, user_address(Chain::Btc), btc(ONE), txid(7));
    let err = engine
        .schedule(item, 2 * ONE)
        .expect_err("min out cannot be met");
    assert!(matches!(err, EngineError::BelowMinimum { .. }));

    assert_eq!(engine.store().version(), version);
    assert!(engine.drain_events().is_empty());
}

#[test]
fn test_governance_overrides_apply_per_block() {
    let mut overrides = MimirOverrides::new();
    overrides.set(ParamKey::OutboundTransactionFee, 0);

    let (engine, _vaults) = setup(&[]);
    let mut engine = engine.with_governance(Box::new(overrides));
    engine.begin_block(HEIGHT + 1);

    assert_eq!(engine.params().outbound_transaction_fee, 0);
    assert_eq!(
        ProtocolParams::default().outbound_transaction_fee,
        2_000_000
    );
}
