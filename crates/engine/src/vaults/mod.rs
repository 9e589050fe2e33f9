//! The vault registry: balances, statuses and the choice of paying vaults.

pub mod security;
pub mod selection;

use custody_primitives::{
    asset::Coin,
    chain::Chain,
    ids::{Address, PubKey},
    vault::{Vault, VaultStatus},
};
use tracing::info;

use crate::{
    context::CustodyCtx,
    errors::{EngineError, EngineResult},
    events::CustodyEvent,
    store::CustodyStore,
};

impl CustodyCtx<'_> {
    /// Loads a vault, failing if it does not exist.
    pub(crate) fn require_vault(&self, pub_key: &PubKey) -> EngineResult<Vault> {
        self.store()
            .vault(pub_key)?
            .ok_or_else(|| EngineError::UnknownVault(pub_key.clone()))
    }

    /// Adds `coins` to the vault.
    pub fn credit_funds(&mut self, pub_key: &PubKey, coins: &[Coin]) -> EngineResult<()> {
        let mut vault = self.require_vault(pub_key)?;
        vault.add_funds(coins);
        self.store_mut().put_vault(&vault)?;

        Ok(())
    }

    /// Subtracts `coins` from the vault, each clamped at the available balance.
    ///
    /// Returns the coins actually subtracted.
    pub fn debit_funds(&mut self, pub_key: &PubKey, coins: &[Coin]) -> EngineResult<Vec<Coin>> {
        let mut vault = self.require_vault(pub_key)?;
        let debited = coins
            .iter()
            .map(|coin| Coin::new(coin.asset.clone(), vault.sub_funds(coin)))
            .collect();
        self.store_mut().put_vault(&vault)?;

        Ok(debited)
    }

    /// Moves the vault to `status`. Statuses never move backwards.
    pub fn set_vault_status(&mut self, pub_key: &PubKey, status: VaultStatus) -> EngineResult<()> {
        let mut vault = self.require_vault(pub_key)?;
        let from = vault.status;
        vault.advance_status(status, self.height)?;
        if from == status {
            return Ok(());
        }

        self.store_mut().put_vault(&vault)?;

        info!(vault = %pub_key, %from, to = %status, "vault status changed");
        self.emit(CustodyEvent::VaultStatusChanged {
            vault: pub_key.clone(),
            from,
            to: status,
        });

        Ok(())
    }

    /// The vault whose address on `chain` is `address`, if any.
    pub(crate) fn vault_for_address(
        &self,
        chain: Chain,
        address: &Address,
    ) -> EngineResult<Option<Vault>> {
        Ok(self
            .store()
            .vaults()?
            .into_iter()
            .find(|v| v.address(chain) == Some(address)))
    }
}
