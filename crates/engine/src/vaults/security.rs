//! Orders vaults by how safely they can take on new outbound payments.

use std::{cmp::Ordering, collections::BTreeMap};

use custody_primitives::{
    ids::PubKey,
    types::{Amount, BlockHeight},
    vault::Vault,
};

use crate::{
    context::CustodyCtx,
    errors::EngineResult,
    pricing::PricingOracle,
    store::CustodyStore,
};

/// The sort key of a vault. Smaller ranks are more secure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityRank {
    /// Items scheduled on the vault within the signing window that are still unsigned.
    pub unsigned: usize,

    /// Native value of the vault's holdings.
    pub value: Amount,

    /// Height at which the vault entered its status.
    pub status_since: BlockHeight,

    /// The vault's public key.
    pub pub_key: PubKey,
}

impl Ord for SecurityRank {
    fn cmp(&self, other: &Self) -> Ordering {
        self.unsigned
            .cmp(&other.unsigned)
            .then_with(|| other.value.cmp(&self.value))
            .then_with(|| self.status_since.cmp(&other.status_since))
            .then_with(|| self.pub_key.cmp(&other.pub_key))
    }
}

impl PartialOrd for SecurityRank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl CustodyCtx<'_> {
    /// Sorts `vaults` from most to least secure, counting unsigned items scheduled in the last
    /// `window` blocks.
    pub fn sort_by_security(&self, vaults: Vec<Vault>, window: u64) -> EngineResult<Vec<Vault>> {
        let from = self.height.saturating_sub(window);
        let mut unsigned: BTreeMap<PubKey, usize> = BTreeMap::new();
        for txout in self.store().scheduled_between(from, self.height)? {
            for item in txout.pending() {
                if let Some(vault) = &item.vault_pub_key {
                    *unsigned.entry(vault.clone()).or_default() += 1;
                }
            }
        }

        let mut ranked = vaults
            .into_iter()
            .map(|vault| {
                let rank = SecurityRank {
                    unsigned: unsigned.get(&vault.pub_key).copied().unwrap_or_default(),
                    value: self.holdings_value(&vault)?,
                    status_since: vault.status_since,
                    pub_key: vault.pub_key.clone(),
                };
                Ok((rank, vault))
            })
            .collect::<EngineResult<Vec<_>>>()?;
        ranked.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(ranked.into_iter().map(|(_, vault)| vault).collect())
    }

    /// Native value of everything the vault holds. Assets without a pool count as zero.
    fn holdings_value(&self, vault: &Vault) -> EngineResult<Amount> {
        let mut total: Amount = 0;
        for coin in vault.coins() {
            total = total.saturating_add(self.store().coin_value_or_zero(&coin)?);
        }

        Ok(total)
    }
}
