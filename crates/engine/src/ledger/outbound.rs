//! Settling observed outbounds against the queue.

use custody_primitives::{
    asset::Coin,
    ids::TxId,
    memo::Memo,
    tx::ObservedTx,
    txout::TxOutItem,
    types::BlockHeight,
};
use tracing::{info, warn};

use crate::{
    context::CustodyCtx,
    errors::EngineResult,
    events::CustodyEvent,
    ledger::Direction,
    store::CustodyStore,
    voter::events::VoterEvent,
};

/// A queued item an observed outbound was matched to.
#[derive(Debug)]
struct Matched {
    height: BlockHeight,
    idx: usize,
    item: TxOutItem,
}

impl CustodyCtx<'_> {
    /// Applies the canonical copy of an outbound: marks the queued item it pays as sent and
    /// debits the vault for the coins and gas spent.
    ///
    /// An outbound that pays no queued item is an unauthorized spend and the vault's members are
    /// slashed for it.
    pub(super) fn settle_outbound(&mut self, tx: &ObservedTx) -> EngineResult<()> {
        let vault = &tx.observed_pub_key;
        let memo = self
            .memo_parser
            .parse(&tx.tx.memo)
            .ok()
            .filter(|m| !m.kind.is_inbound());

        let matched = match &memo {
            Some(memo) => self.match_scheduled(tx, memo)?,
            None => None,
        };

        let spent: Vec<Coin> = tx.tx.coins.iter().chain(tx.tx.gas.iter()).cloned().collect();
        self.debit_funds(vault, &spent)?;

        let authorized = matched.is_some();
        match matched {
            Some(matched) => self.mark_sent(tx, matched)?,
            None => {
                warn!(tx_id = %tx.tx.id, %vault, "unauthorized outbound");
                self.slash_vault(vault, &tx.tx.coins)?;
            }
        }

        self.emit(CustodyEvent::OutboundObserved {
            tx_id: tx.tx.id.clone(),
            vault: vault.clone(),
            authorized,
        });

        Ok(())
    }

    /// Finds the pending item `tx` pays.
    ///
    /// Payments for an inbound are looked up through the inbound's voter; internal movements
    /// through the queues since the height in their memo.
    fn match_scheduled(&self, tx: &ObservedTx, memo: &Memo) -> EngineResult<Option<Matched>> {
        let heights: Vec<BlockHeight> = match (&memo.tx_id, memo.block_height) {
            (Some(in_hash), _) => {
                let Some(voter) = self.store().voter(in_hash)? else {
                    return Ok(None);
                };
                let mut heights: Vec<_> = voter.actions().iter().map(|a| a.height).collect();
                heights.sort_unstable();
                heights.dedup();
                heights
            }
            (None, from) => {
                let from = from.unwrap_or_else(|| {
                    self.height
                        .saturating_sub(self.params.signing_transaction_period)
                });
                self.store()
                    .scheduled_between(from, self.height)?
                    .into_iter()
                    .map(|txout| txout.height)
                    .collect()
            }
        };

        for height in heights {
            let txout = self.store().txout(height)?;
            let found = txout
                .items
                .iter()
                .enumerate()
                .find(|(_, item)| item.is_pending() && pays(item, tx));
            if let Some((idx, item)) = found {
                return Ok(Some(Matched {
                    height,
                    idx,
                    item: item.clone(),
                }));
            }
        }

        Ok(None)
    }

    /// Records `tx` as the payment of the matched item, on the queue and on the inbound voter.
    fn mark_sent(&mut self, tx: &ObservedTx, matched: Matched) -> EngineResult<()> {
        let out_hash: TxId = tx.tx.id.clone();

        let mut txout = self.store().txout(matched.height)?;
        let Some(item) = txout.items.get_mut(matched.idx) else {
            return Ok(());
        };
        item.out_hash = Some(out_hash.clone());
        let sent = item.clone();
        self.store_mut().put_txout(&txout)?;

        let in_hash = &matched.item.in_hash;
        if !in_hash.is_blank() {
            if let Some(mut voter) = self.store().voter(in_hash)? {
                voter.update_action_item(matched.height, &sent);
                self.store_mut().put_voter(&voter)?;
                self.advance_voter(
                    Direction::Inbound,
                    in_hash,
                    VoterEvent::OutboundObserved { out_hash },
                )?;
            }
        }

        info!(
            %in_hash,
            out_hash = %tx.tx.id,
            height = %matched.height,
            "outbound observed"
        );
        Ok(())
    }
}

/// Returns whether `tx` is the payment of `item`.
fn pays(item: &TxOutItem, tx: &ObservedTx) -> bool {
    item.chain == tx.tx.chain
        && item.vault_pub_key.as_ref() == Some(&tx.observed_pub_key)
        && item.to_address == tx.tx.to_address
        && item.memo == tx.tx.memo
        && tx.tx.coins.contains(&item.coin)
}
