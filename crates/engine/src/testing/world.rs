//! A store pre-populated with validators, vaults, pools and fees, and contexts over it.

use custody_db::inmemory::InMemoryStore;
use custody_params::protocol::ProtocolParams;
use custody_primitives::{
    asset::Coin,
    chain::Chain,
    memo::StandardMemoParser,
    network_fee::NetworkFee,
    pool::Pool,
    types::{Amount, BlockHeight, ONE},
    validator::Validator,
    vault::{Vault, VaultStatus},
};
use custody_test_utils::fixtures::{active_validators, shared_vault};

use crate::{context::CustodyCtx, events::CustodyEvent, store::CustodyStore};

/// Max gas of a BTC outbound under the fixture network fee of 250 bytes at 20 per byte.
pub(crate) const BTC_MAX_GAS: Amount = 7_500;

/// One BTC is worth this much of the native asset in the fixture pool.
pub(crate) const BTC_PRICE: Amount = 100;

pub(crate) fn btc(amount: Amount) -> Coin {
    Coin::new(Chain::Btc.gas_asset(), amount)
}

#[derive(Debug)]
pub(crate) struct TestWorld {
    pub(crate) store: InMemoryStore,
    pub(crate) params: ProtocolParams,
    pub(crate) events: Vec<CustodyEvent>,
    pub(crate) validators: Vec<Validator>,
}

impl TestWorld {
    /// `n` active validators, a BTC pool and a BTC network fee.
    pub(crate) fn new(n: usize) -> Self {
        let mut store = InMemoryStore::new();
        let validators = active_validators(n);
        for validator in &validators {
            store.put_validator(validator).expect("must store validator");
        }
        store
            .put_pool(&Pool::new(
                Chain::Btc.gas_asset(),
                1_000 * BTC_PRICE * ONE,
                1_000 * ONE,
            ))
            .expect("must store pool");
        store
            .put_network_fee(&NetworkFee::new(Chain::Btc, 250, 20))
            .expect("must store fee");

        Self {
            store,
            params: ProtocolParams::default(),
            events: Vec::new(),
            validators,
        }
    }

    /// Stores a shared vault owned by every validator, holding `coins`.
    pub(crate) fn add_shared_vault(
        &mut self,
        name: &str,
        status: VaultStatus,
        coins: &[Coin],
    ) -> Vault {
        let mut vault = shared_vault(name, status, &self.validators);
        vault.add_funds(coins);
        self.store.put_vault(&vault).expect("must store vault");
        vault
    }

    pub(crate) fn vault(&self, vault: &Vault) -> Vault {
        self.store
            .vault(&vault.pub_key)
            .expect("must read vault")
            .expect("vault must exist")
    }

    pub(crate) fn ctx(&mut self, height: BlockHeight) -> CustodyCtx<'_> {
        CustodyCtx::new(
            height,
            &mut self.store,
            &self.params,
            &StandardMemoParser,
            &mut self.events,
        )
    }
}
