//! Choosing the vaults that pay an outbound.
//!
//! Selection is a greedy pass over an ordered list of candidates. Three orderings are tried:
//!
//! - per-node vaults first, then active shared vaults;
//! - active shared vaults first, then per-node vaults;
//! - retiring shared vaults only.
//!
//! The first two compete on [`SelectionPlan::rank`]; the retiring plan only wins if it is the
//! only satisfied one or needs strictly fewer legs.

use std::{cmp::Ordering, collections::BTreeMap};

use custody_primitives::{
    asset::Asset,
    ids::{Address, PubKey},
    txout::TxOutItem,
    types::Amount,
    vault::{Vault, VaultStatus},
};
use tracing::debug;

use crate::{
    context::CustodyCtx,
    errors::{EngineError, EngineResult},
    store::CustodyStore,
};

/// A vault as seen by the greedy pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// The vault.
    pub pub_key: PubKey,

    /// The vault's address on the payment's chain.
    pub address: Option<Address>,

    /// Balance of the paid asset, net of pending payments.
    pub asset_balance: Amount,

    /// Balance of the chain's gas asset, net of pending payments and their gas.
    pub gas_balance: Amount,
}

/// What the greedy pass has to cover.
#[derive(Debug, Clone, Copy)]
pub struct SelectionRequest<'a> {
    /// The payment's destination.
    pub destination: &'a Address,

    /// The amount to cover.
    pub amount: Amount,

    /// The outbound fee in the paid asset; a vault must hold more than this.
    pub fee_asset: Amount,

    /// Gas a vault must hold to send one transaction.
    pub max_gas: Amount,
}

/// One vault's share of a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLeg {
    /// The paying vault.
    pub vault: PubKey,

    /// The amount it pays.
    pub amount: Amount,
}

/// The outcome of one greedy pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionPlan {
    /// The legs, in candidate order.
    pub legs: Vec<SourceLeg>,

    /// The amount no candidate could cover.
    pub remaining: Amount,
}

impl SelectionPlan {
    /// Returns whether the plan covers the whole amount.
    pub const fn is_satisfied(&self) -> bool {
        self.remaining == 0
    }

    /// Orders plans from best to worst: satisfied first, then fewer legs, then lower remainder,
    /// then the smaller sequence of vault keys.
    pub fn rank(&self, other: &Self) -> Ordering {
        (!self.is_satisfied())
            .cmp(&!other.is_satisfied())
            .then_with(|| self.legs.len().cmp(&other.legs.len()))
            .then_with(|| self.remaining.cmp(&other.remaining))
            .then_with(|| {
                let ours = self.legs.iter().map(|l| &l.vault);
                let theirs = other.legs.iter().map(|l| &l.vault);
                ours.cmp(theirs)
            })
    }
}

/// Runs the greedy pass over `candidates` in order.
pub fn select_sources(req: &SelectionRequest<'_>, candidates: &[Candidate]) -> SelectionPlan {
    let mut remaining = req.amount;
    let mut legs = Vec::new();

    for candidate in candidates {
        if remaining == 0 {
            break;
        }
        if candidate.address.as_ref() == Some(req.destination) {
            continue;
        }
        if candidate.asset_balance <= req.fee_asset {
            continue;
        }
        if candidate.gas_balance < req.max_gas {
            continue;
        }

        let amount = candidate.asset_balance.min(remaining);
        remaining -= amount;
        legs.push(SourceLeg {
            vault: candidate.pub_key.clone(),
            amount,
        });
    }

    SelectionPlan { legs, remaining }
}

/// Picks between the active orderings and the retiring plan.
pub fn choose_plan(
    per_node_first: SelectionPlan,
    shared_first: SelectionPlan,
    retiring: SelectionPlan,
) -> SelectionPlan {
    let best = match per_node_first.rank(&shared_first) {
        Ordering::Greater => shared_first,
        _ => per_node_first,
    };

    let retiring_wins = retiring.is_satisfied()
        && (!best.is_satisfied() || retiring.legs.len() < best.legs.len());
    if retiring_wins {
        retiring
    } else {
        best
    }
}

/// Amounts already promised by pending items, per vault and asset.
type Committed = BTreeMap<(PubKey, Asset), Amount>;

impl CustodyCtx<'_> {
    /// Picks the vaults that pay `item`, net of every payment still pending.
    ///
    /// Fails with [`EngineError::InsufficientFunds`] if no plan covers the amount.
    pub fn select_outbound_sources(
        &self,
        item: &TxOutItem,
        fee_asset: Amount,
        max_gas: Amount,
    ) -> EngineResult<SelectionPlan> {
        let committed = self.committed_funds()?;
        let req = SelectionRequest {
            destination: &item.to_address,
            amount: item.coin.amount,
            fee_asset,
            max_gas,
        };

        let vaults = self.store().vaults()?;
        let window = self.params.signing_transaction_period;

        let shared: Vec<Vault> = vaults
            .iter()
            .filter(|v| v.is_shared() && v.status == VaultStatus::Active && !v.frozen)
            .cloned()
            .collect();
        let shared = self.sort_by_security(shared, window)?;

        let retiring: Vec<Vault> = vaults
            .iter()
            .filter(|v| v.is_shared() && v.status == VaultStatus::Retiring && !v.frozen)
            .cloned()
            .collect();
        let retiring = self.sort_by_security(retiring, window)?;

        let per_node = self.eligible_per_node_vaults(item, &vaults)?;

        let to_candidates = |vaults: &[Vault]| -> Vec<Candidate> {
            vaults
                .iter()
                .map(|v| candidate(v, item, &committed))
                .collect()
        };

        let mut per_node = to_candidates(&per_node);
        per_node.sort_by(|a, b| {
            b.asset_balance
                .cmp(&a.asset_balance)
                .then_with(|| a.pub_key.cmp(&b.pub_key))
        });
        let shared = to_candidates(&shared);

        let per_node_first: Vec<Candidate> =
            per_node.iter().chain(shared.iter()).cloned().collect();
        let shared_first: Vec<Candidate> =
            shared.iter().chain(per_node.iter()).cloned().collect();

        let plan = choose_plan(
            select_sources(&req, &per_node_first),
            select_sources(&req, &shared_first),
            select_sources(&req, &to_candidates(&retiring)),
        );

        if !plan.is_satisfied() {
            debug!(
                coin = %item.coin,
                remaining = %plan.remaining,
                "no vault combination covers outbound"
            );
            return Err(EngineError::InsufficientFunds {
                coin: item.coin.clone(),
                remaining: plan.remaining,
            });
        }

        Ok(plan)
    }

    /// Net balance of `asset` in `vault` after every pending payment.
    pub(crate) fn net_balance(&self, vault: &Vault, asset: &Asset) -> EngineResult<Amount> {
        let committed = self.committed_funds()?;
        Ok(net(vault, asset, &committed))
    }

    /// Coins and gas promised by pending items that are still inside their signing window or
    /// not yet due.
    ///
    /// Vault balances are debited only once the outbound is observed, so an item whose height
    /// has passed keeps its reservation until it is sent or superseded.
    fn committed_funds(&self) -> EngineResult<Committed> {
        let from = self
            .height
            .saturating_sub(self.params.signing_transaction_period);
        let horizon = self.height.saturating_add(self.params.tx_out_delay_max);
        let mut committed = Committed::new();

        for txout in self.store().scheduled_between(from, horizon)? {
            for item in txout.pending() {
                let Some(vault) = &item.vault_pub_key else {
                    continue;
                };

                for coin in std::iter::once(&item.coin).chain(item.max_gas.iter()) {
                    let entry = committed
                        .entry((vault.clone(), coin.asset.clone()))
                        .or_default();
                    *entry = entry.saturating_add(coin.amount);
                }
            }
        }

        Ok(committed)
    }

    /// Per-node vaults whose owner signed the canonical copy of the inbound and may take on
    /// payments.
    fn eligible_per_node_vaults(
        &self,
        item: &TxOutItem,
        vaults: &[Vault],
    ) -> EngineResult<Vec<Vault>> {
        if item.in_hash.is_blank() {
            return Ok(Vec::new());
        }
        let Some(voter) = self.store().voter(&item.in_hash)? else {
            return Ok(Vec::new());
        };
        let signers = voter.canonical_signers();

        let mut eligible = Vec::new();
        for vault in vaults {
            if !vault.is_per_node() || vault.status == VaultStatus::Inactive || vault.frozen {
                continue;
            }

            let Some(owner) = self.store().validator_by_pub_key(&vault.pub_key)? else {
                continue;
            };
            if !signers.contains(&owner.address) || owner.is_jailed(self.height) {
                continue;
            }

            eligible.push(vault.clone());
        }

        Ok(eligible)
    }
}

fn net(vault: &Vault, asset: &Asset, committed: &Committed) -> Amount {
    let promised = committed
        .get(&(vault.pub_key.clone(), asset.clone()))
        .copied()
        .unwrap_or_default();
    vault.balance(asset).saturating_sub(promised)
}

fn candidate(vault: &Vault, item: &TxOutItem, committed: &Committed) -> Candidate {
    let gas_asset = item.chain.gas_asset();
    Candidate {
        pub_key: vault.pub_key.clone(),
        address: vault.address(item.chain).cloned(),
        asset_balance: net(vault, &item.coin.asset, committed),
        gas_balance: net(vault, &gas_asset, committed),
    }
}
