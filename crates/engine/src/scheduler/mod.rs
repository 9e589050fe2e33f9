//! The outbound scheduler.
//!
//! Turns a payment request into one or more queued items: it picks the paying vaults, deducts
//! the protocol fee, decides the height the payment is sent at and links every item back to the
//! inbound it pays out against.

pub mod delay;
pub mod gas;


use custody_primitives::{
    asset::Coin,
    memo::{Memo, MemoKind},
    network_fee::NetworkFee,
    pool::Pool,
    txout::TxOutItem,
    types::{mul_div, Amount, BlockHeight},
};
use tracing::{debug, info};

use crate::{
    context::CustodyCtx,
    errors::{EngineError, EngineResult},
    events::CustodyEvent,
    pricing::PricingOracle,
    store::CustodyStore,
    vaults::selection::SourceLeg,
    voter::state::OutboundAction,
};

/// The items a request was turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledOutbound {
    /// The queue height the items were appended to.
    pub height: BlockHeight,

    /// The items, one per paying vault.
    pub items: Vec<TxOutItem>,
}

/// A leg after fee deduction, with the fee it was charged.
#[derive(Debug)]
struct PricedLeg {
    item: TxOutItem,
    fee_native: Amount,
}

impl CustodyCtx<'_> {
    /// Schedules `item`, failing if less than `min_out` would reach the destination.
    ///
    /// Nothing is written unless the whole request can be scheduled.
    pub fn schedule(
        &mut self,
        mut item: TxOutItem,
        min_out: Amount,
    ) -> EngineResult<ScheduledOutbound> {
        if item.memo.is_empty() {
            item.memo = Memo::outbound(&item.in_hash);
        }
        let kind = self.validate_outbound(&item)?;

        if item.chain.is_native() {
            return self.schedule_native(item, kind, min_out);
        }

        let network_fee = self
            .store()
            .network_fee(item.chain)?
            .filter(NetworkFee::is_valid)
            .ok_or(EngineError::MissingNetworkFee(item.chain))?;
        let max_gas = network_fee.max_gas();
        item.max_gas = vec![max_gas.clone()];
        item.gas_rate = network_fee.transaction_fee_rate;

        let exempt = kind.is_fee_exempt();
        let fee_native = if exempt {
            0
        } else {
            self.params.outbound_transaction_fee
        };
        let fee_asset = match self.store().rune_value_in_asset(&item.coin.asset, fee_native) {
            Ok(fee) => fee,
            Err(EngineError::MissingPool(_)) => 0,
            Err(e) => return Err(e),
        };

        let legs = match &item.vault_pub_key {
            Some(vault) => {
                self.require_vault(vault)?;
                vec![SourceLeg {
                    vault: vault.clone(),
                    amount: item.coin.amount,
                }]
            }
            None => {
                self.select_outbound_sources(&item, fee_asset, max_gas.amount)?
                    .legs
            }
        };

        let mut priced = Vec::with_capacity(legs.len());
        for leg in legs {
            let leg_fee = fee_asset.min(leg.amount);
            let mut amount = leg.amount - leg_fee;
            if kind == MemoKind::Ragnarok && item.coin.asset.is_gas_asset() {
                amount = amount.saturating_sub(max_gas.amount);
            }
            if amount == 0 && !exempt {
                debug!(vault = %leg.vault, "dropping outbound leg consumed by fees");
                continue;
            }

            let mut leg_item = item.clone();
            leg_item.vault_pub_key = Some(leg.vault);
            leg_item.coin = Coin::new(item.coin.asset.clone(), amount);
            leg_item.fee = leg_fee;

            // a fee clamped by a small leg is charged pro rata
            let leg_fee_native = if leg_fee == fee_asset {
                fee_native
            } else {
                mul_div(fee_native, leg_fee, fee_asset)
            };
            priced.push(PricedLeg {
                item: leg_item,
                fee_native: leg_fee_native,
            });
        }

        let total = priced
            .iter()
            .fold(0, |acc: Amount, leg| acc.saturating_add(leg.item.coin.amount));
        if total < min_out {
            return Err(EngineError::BelowMinimum { total, min_out });
        }

        let height = self.outbound_height_for(&item, kind)?;

        self.collect_fees(&item.coin, &priced)?;
        let items: Vec<TxOutItem> = priced.into_iter().map(|leg| leg.item).collect();
        self.append_items(height, &items, kind)?;

        info!(
            in_hash = %item.in_hash,
            coin = %item.coin,
            %height,
            legs = items.len(),
            "scheduled outbound"
        );

        Ok(ScheduledOutbound { height, items })
    }

    /// Appends `item` at the current height without selection, fees or delay.
    pub fn unsafe_schedule(&mut self, item: TxOutItem) -> EngineResult<BlockHeight> {
        let kind = self
            .memo_parser
            .parse(&item.memo)
            .map(|memo| memo.kind)
            .unwrap_or(MemoKind::Noop);

        let height = self.height;
        self.append_items(height, std::slice::from_ref(&item), kind)?;
        debug!(in_hash = %item.in_hash, coin = %item.coin, %height, "force-scheduled outbound");

        Ok(height)
    }

    /// Checks the request and returns its memo kind.
    fn validate_outbound(&self, item: &TxOutItem) -> EngineResult<MemoKind> {
        if item.to_address.is_empty() {
            return Err(EngineError::InvalidInput("empty destination".to_string()));
        }
        if item.coin.asset.chain != item.chain {
            return Err(EngineError::InvalidInput(format!(
                "coin {} cannot be sent on {}",
                item.coin, item.chain
            )));
        }
        let memo = self
            .memo_parser
            .parse(&item.memo)
            .map_err(|e| EngineError::InvalidInput(format!("invalid outbound memo: {e}")))?;

        if self.params.is_blacklisted(&item.to_address) {
            return Err(EngineError::Blacklisted(item.to_address.clone()));
        }
        if let Some(height) = self.store().chain_halt(item.chain)? {
            return Err(EngineError::ChainHalted {
                chain: item.chain,
                height,
            });
        }

        Ok(memo.kind)
    }

    /// Payments on the native chain are settled by the network itself: the flat fee goes to the
    /// reserve and the item is queued at the current height.
    fn schedule_native(
        &mut self,
        mut item: TxOutItem,
        kind: MemoKind,
        min_out: Amount,
    ) -> EngineResult<ScheduledOutbound> {
        let fee = if kind.is_fee_exempt() {
            0
        } else {
            self.params.outbound_transaction_fee.min(item.coin.amount)
        };
        item.coin.amount -= fee;
        item.fee = fee;

        if item.coin.amount < min_out {
            return Err(EngineError::BelowMinimum {
                total: item.coin.amount,
                min_out,
            });
        }

        let height = self.height;
        if fee > 0 {
            self.store_mut().credit_reserve(fee)?;
            self.emit(CustodyEvent::Fee {
                in_hash: item.in_hash.clone(),
                coin: Coin::new(item.coin.asset.clone(), fee),
                reserve_credit: fee,
            });
        }

        let items = if item.coin.amount == 0 && !kind.is_fee_exempt() {
            Vec::new()
        } else {
            let mut txout = self.store().txout(height)?;
            txout.items.push(item.clone());
            self.store_mut().put_txout(&txout)?;
            self.emit(CustodyEvent::OutboundScheduled {
                height,
                item: item.clone(),
            });
            vec![item]
        };

        Ok(ScheduledOutbound { height, items })
    }

    /// The height the payment is sent at. Throttled payments of one inbound all share the
    /// height chosen for the first of them.
    fn outbound_height_for(&self, item: &TxOutItem, kind: MemoKind) -> EngineResult<BlockHeight> {
        if !kind.is_throttled() || item.chain.is_native() || item.in_hash.is_blank() {
            return Ok(self.height);
        }

        if let Some(height) = self
            .store()
            .voter(&item.in_hash)?
            .and_then(|v| v.outbound_height())
        {
            return Ok(height);
        }

        let value = self.store().coin_value_or_zero(&item.coin)?;
        self.outbound_target_height(value)
    }

    /// Adds the legs' fees to the pool and moves their native value to the reserve.
    fn collect_fees(&mut self, requested: &Coin, legs: &[PricedLeg]) -> EngineResult<()> {
        let mut pool: Option<Pool> = if requested.asset.is_native() {
            None
        } else {
            self.store().pool(&requested.asset)?
        };

        for leg in legs.iter().filter(|leg| leg.item.fee > 0) {
            let reserve_credit = match pool.as_mut() {
                Some(pool) => {
                    let native = leg.fee_native.min(pool.balance_native);
                    pool.balance_asset = pool.balance_asset.saturating_add(leg.item.fee);
                    pool.balance_native -= native;
                    native
                }
                None => leg.item.fee,
            };

            self.store_mut().credit_reserve(reserve_credit)?;
            self.emit(CustodyEvent::Fee {
                in_hash: leg.item.in_hash.clone(),
                coin: Coin::new(leg.item.coin.asset.clone(), leg.item.fee),
                reserve_credit,
            });
        }

        if let Some(pool) = pool {
            self.store_mut().put_pool(&pool)?;
        }

        Ok(())
    }

    /// Appends `items` at `height` and links them to their inbound voter.
    fn append_items(
        &mut self,
        height: BlockHeight,
        items: &[TxOutItem],
        kind: MemoKind,
    ) -> EngineResult<()> {
        if items.is_empty() {
            return Ok(());
        }

        let mut txout = self.store().txout(height)?;
        txout.items.extend(items.iter().cloned());
        self.store_mut().put_txout(&txout)?;

        for item in items {
            if !item.in_hash.is_blank() {
                if let Some(mut voter) = self.store().voter(&item.in_hash)? {
                    if kind.is_throttled() {
                        voter.pin_outbound_height(height);
                    }
                    voter.record_action(OutboundAction {
                        item: item.clone(),
                        height,
                    });
                    self.store_mut().put_voter(&voter)?;
                }
            }

            if kind == MemoKind::YggdrasilFund {
                self.mark_funding_sent(item)?;
            }

            self.emit(CustodyEvent::OutboundScheduled {
                height,
                item: item.clone(),
            });
        }

        Ok(())
    }

    /// Records on the funded per-node vault that a funding leg is on its way.
    fn mark_funding_sent(&mut self, item: &TxOutItem) -> EngineResult<()> {
        let Some(mut vault) = self.vault_for_address(item.chain, &item.to_address)? else {
            return Ok(());
        };
        if !vault.is_per_node() {
            return Ok(());
        }

        let height = self
            .memo_parser
            .parse(&item.memo)
            .ok()
            .and_then(|memo| memo.block_height)
            .unwrap_or(self.height);
        vault.append_pending_height(height);
        self.store_mut().put_vault(&vault)?;

        Ok(())
    }
}
