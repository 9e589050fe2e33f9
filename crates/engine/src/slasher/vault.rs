//! Slashing the members of a vault that lost funds.

use custody_primitives::{
    asset::Coin,
    ids::PubKey,
    types::{mul_div, Amount, BASIS_POINTS},
    validator::Validator,
    vault::Vault,
};
use tracing::{info, warn};

use crate::{
    context::CustodyCtx,
    errors::EngineResult,
    events::CustodyEvent,
    pricing::PricingOracle,
    store::CustodyStore,
};

/// How a vault slash was settled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VaultSlash {
    /// Native value of the lost coins.
    pub lost_value: Amount,

    /// Bond taken from the members.
    pub slashed: Amount,

    /// Part of the slashed bond paid to pools to make up for the lost coins.
    pub pool_credit: Amount,

    /// Part of the slashed bond paid to the reserve.
    pub reserve_credit: Amount,
}

impl CustodyCtx<'_> {
    /// Takes bond from the members of `vault` for `coins` it lost, pro rata to their bonds.
    ///
    /// The bond taken first makes the affected pools whole, the rest goes to the reserve. A loss
    /// at or above the pause threshold halts the chains involved and freezes the vault.
    pub fn slash_vault(&mut self, vault: &PubKey, coins: &[Coin]) -> EngineResult<VaultSlash> {
        let mut vault = self.require_vault(vault)?;

        let mut values = Vec::with_capacity(coins.len());
        for coin in coins {
            values.push(self.store().coin_value_or_zero(coin)?);
        }
        let lost_value = values
            .iter()
            .fold(0, |acc: Amount, v| acc.saturating_add(*v));
        if lost_value == 0 {
            return Ok(VaultSlash::default());
        }

        let mut members = Vec::new();
        for key in &vault.membership {
            if let Some(member) = self.store().validator_by_pub_key(key)? {
                members.push(member);
            }
        }

        let penalty = mul_div(lost_value, self.params.slash_penalty_bps, BASIS_POINTS);
        let slashed = self.slash_bonds(&mut members, penalty)?;

        let mut remaining = slashed;
        let mut pool_credit: Amount = 0;
        for (coin, value) in coins.iter().zip(values) {
            if remaining == 0 {
                break;
            }
            if coin.asset.is_native() || value == 0 {
                continue;
            }
            let Some(mut pool) = self.store().pool(&coin.asset)? else {
                continue;
            };

            let credit = remaining.min(value);
            let asset_amount = if credit == value {
                coin.amount
            } else {
                mul_div(coin.amount, credit, value)
            }
            .min(pool.balance_asset);

            pool.balance_asset -= asset_amount;
            pool.balance_native = pool.balance_native.saturating_add(credit);
            self.store_mut().put_pool(&pool)?;

            remaining -= credit;
            pool_credit += credit;
            self.emit(CustodyEvent::PoolSlashed {
                asset: coin.asset.clone(),
                asset_amount,
                native_amount: credit,
            });
        }
        self.store_mut().credit_reserve(remaining)?;

        info!(
            vault = %vault.pub_key,
            %lost_value,
            %slashed,
            %pool_credit,
            "slashed vault members"
        );

        let threshold = self.params.pause_on_slash_threshold;
        if threshold > 0 && lost_value >= threshold {
            self.pause_after_loss(&mut vault, coins)?;
        }

        Ok(VaultSlash {
            lost_value,
            slashed,
            pool_credit,
            reserve_credit: remaining,
        })
    }

    /// Reduces the members' bonds by `total` split by bond weight, and returns the bond taken.
    ///
    /// Rounding dust is taken from the largest bond.
    fn slash_bonds(&mut self, members: &mut [Validator], total: Amount) -> EngineResult<Amount> {
        let total_bond = members
            .iter()
            .fold(0, |acc: Amount, m| acc.saturating_add(m.bond));
        let total = total.min(total_bond);
        if total == 0 {
            return Ok(0);
        }

        let mut shares: Vec<Amount> = members
            .iter()
            .map(|m| mul_div(total, m.bond, total_bond).min(m.bond))
            .collect();
        let dust = total.saturating_sub(shares.iter().sum());
        if let Some(largest) = members
            .iter()
            .enumerate()
            .max_by(|(ia, a), (ib, b)| a.bond.cmp(&b.bond).then_with(|| ib.cmp(ia)))
            .map(|(idx, _)| idx)
        {
            shares[largest] = shares[largest].saturating_add(dust);
        }

        let mut slashed: Amount = 0;
        for (member, share) in members.iter_mut().zip(shares) {
            let taken = member.reduce_bond(share);
            if taken == 0 {
                continue;
            }

            self.store_mut().put_validator(member)?;
            slashed += taken;
            self.emit(CustodyEvent::BondSlashed {
                node: member.address.clone(),
                amount: taken,
                reason: "vault lost funds".to_string(),
            });
        }

        Ok(slashed)
    }

    fn pause_after_loss(
        &mut self,
        vault: &mut Vault,
        coins: &[Coin],
    ) -> EngineResult<()> {
        let height = self.height;
        let mut chains: Vec<_> = coins
            .iter()
            .map(|c| c.asset.chain)
            .filter(|c| !c.is_native())
            .collect();
        chains.sort();
        chains.dedup();

        for chain in chains {
            if self.store().chain_halt(chain)?.is_some() {
                continue;
            }

            self.store_mut().halt_chain(chain, height)?;
            warn!(%chain, vault = %vault.pub_key, "halting chain after vault loss");
            self.emit(CustodyEvent::ChainHalted { chain, height });
        }

        vault.frozen = true;
        self.store_mut().put_vault(vault)?;

        Ok(())
    }
}
