//! Penalties for not signing, and reassignment of the payments that were not signed.

use std::collections::BTreeMap;

use custody_primitives::{
    asset::Asset,
    network_fee::NetworkFee,
    txout::TxOutItem,
    types::{Amount, BlockHeight},
    vault::{Vault, VaultStatus},
};
use tracing::{info, warn};

use crate::{
    context::CustodyCtx,
    errors::EngineResult,
    events::CustodyEvent,
    store::CustodyStore,
    validators::PointKind,
    voter::state::OutboundAction,
};

impl CustodyCtx<'_> {
    /// Penalizes the owners of every vault that left an item scheduled exactly `window` blocks
    /// ago unsigned, then moves the item to another vault.
    ///
    /// A failure on one item is logged and does not stop the others.
    pub fn penalize_lack_of_signing(&mut self, window: u64) -> EngineResult<()> {
        if window == 0 {
            return Ok(());
        }
        let Some(scheduled_at) = self.height.checked_sub(window) else {
            return Ok(());
        };

        let txout = self.store().txout(scheduled_at)?;
        for (idx, item) in txout.items.iter().enumerate() {
            if !item.is_pending() || item.vault_pub_key.is_none() {
                continue;
            }

            let res: EngineResult<()> =
                self.atomically(|ctx| ctx.handle_unsigned(scheduled_at, idx, item, window));
            if let Err(e) = res {
                warn!(
                    in_hash = %item.in_hash,
                    %scheduled_at,
                    %e,
                    "failed to handle unsigned outbound"
                );
            }
        }

        Ok(())
    }

    fn handle_unsigned(
        &mut self,
        scheduled_at: BlockHeight,
        idx: usize,
        item: &TxOutItem,
        window: u64,
    ) -> EngineResult<()> {
        if self.store().chain_halt(item.chain)?.is_some() {
            return Ok(());
        }
        let Some(vault_key) = &item.vault_pub_key else {
            return Ok(());
        };
        let Some(vault) = self.store().vault(vault_key)? else {
            warn!(vault = %vault_key, "unsigned outbound refers to unknown vault");
            return Ok(());
        };

        self.penalize_vault_owners(&vault)?;

        // an item whose memo does not parse stays where it is, like an internal movement
        let kind = match self.memo_parser.parse(&item.memo) {
            Ok(memo) => memo.kind,
            Err(e) => {
                warn!(
                    in_hash = %item.in_hash,
                    vault = %vault.pub_key,
                    %e,
                    "unsigned outbound has an unparseable memo, not reassigning"
                );
                return Ok(());
            }
        };
        if kind.is_internal() {
            return Ok(());
        }
        if self.exceeded_attempts(item, window)? {
            return Ok(());
        }

        let mut replacement = item.clone();
        replacement.superseded_at = None;
        if let Some(fee) = self
            .store()
            .network_fee(item.chain)?
            .filter(NetworkFee::is_valid)
        {
            replacement.max_gas = vec![fee.max_gas()];
            replacement.gas_rate = fee.transaction_fee_rate;
        }

        let to_vault = match self.replacement_vault(&vault, &replacement, window)? {
            Some(other) => other.pub_key,
            None => vault.pub_key.clone(),
        };
        replacement.vault_pub_key = Some(to_vault.clone());

        let height = self.height;
        let mut old_txout = self.store().txout(scheduled_at)?;
        if let Some(old) = old_txout.items.get_mut(idx) {
            old.superseded_at = Some(height);
        }
        self.store_mut().put_txout(&old_txout)?;

        let mut txout = self.store().txout(height)?;
        txout.items.push(replacement.clone());
        self.store_mut().put_txout(&txout)?;

        if !item.in_hash.is_blank() {
            if let Some(mut voter) = self.store().voter(&item.in_hash)? {
                let old = OutboundAction {
                    item: item.clone(),
                    height: scheduled_at,
                };
                let new = OutboundAction {
                    item: replacement.clone(),
                    height,
                };
                if !voter.replace_action(&old, new.clone()) {
                    voter.record_action(new);
                }
                self.store_mut().put_voter(&voter)?;
            }
        }

        info!(
            in_hash = %item.in_hash,
            from = %vault.pub_key,
            to = %to_vault,
            "reassigned unsigned outbound"
        );
        self.emit(CustodyEvent::OutboundReassigned {
            in_hash: item.in_hash.clone(),
            from_vault: vault.pub_key,
            to_vault,
            height,
        });

        Ok(())
    }

    /// Books signing points on every member of `vault`. The owner of a per-node vault is also
    /// jailed.
    fn penalize_vault_owners(&mut self, vault: &Vault) -> EngineResult<()> {
        let points = self.params.signing_slash_points;
        let jail_time = self.params.jail_time_signing;

        for member in &vault.membership {
            let Some(owner) = self.store().validator_by_pub_key(member)? else {
                continue;
            };

            self.add_slash_points(&owner.address, PointKind::Signing, points, "failed to sign")?;
            if vault.is_per_node() {
                self.jail(&owner.address, jail_time, "failed to sign outbound")?;
            }
        }

        Ok(())
    }

    /// Returns whether the payment was retried more often than allowed since its inbound was
    /// finalised.
    fn exceeded_attempts(&self, item: &TxOutItem, window: u64) -> EngineResult<bool> {
        let max_attempts = self.params.max_outbound_attempts;
        if max_attempts == 0 || item.in_hash.is_blank() {
            return Ok(false);
        }

        let Some(finalised_height) = self
            .store()
            .voter(&item.in_hash)?
            .and_then(|v| v.state().finalised_height())
        else {
            return Ok(false);
        };

        let attempts = self.height.saturating_sub(finalised_height) / window;
        if attempts < max_attempts {
            return Ok(false);
        }

        warn!(
            in_hash = %item.in_hash,
            %attempts,
            "abandoning outbound after too many attempts"
        );
        Ok(true)
    }

    /// The most secure other active shared vault that can cover `item` and its gas.
    fn replacement_vault(
        &self,
        current: &Vault,
        item: &TxOutItem,
        window: u64,
    ) -> EngineResult<Option<Vault>> {
        let candidates: Vec<Vault> = self
            .store()
            .vaults()?
            .into_iter()
            .filter(|v| {
                v.pub_key != current.pub_key
                    && v.is_shared()
                    && v.status == VaultStatus::Active
                    && !v.frozen
                    && v
                        .address(item.chain)
                        .is_some_and(|addr| *addr != item.to_address)
            })
            .collect();

        let mut needed: BTreeMap<Asset, Amount> = BTreeMap::new();
        for coin in std::iter::once(&item.coin).chain(item.max_gas.iter()) {
            let entry = needed.entry(coin.asset.clone()).or_default();
            *entry = entry.saturating_add(coin.amount);
        }

        for vault in self.sort_by_security(candidates, window)? {
            let mut covers = true;
            for (asset, amount) in &needed {
                if self.net_balance(&vault, asset)? < *amount {
                    covers = false;
                    break;
                }
            }

            if covers {
                return Ok(Some(vault));
            }
        }

        Ok(None)
    }
}
