//! Re-pricing of queued items to the latest network fee.

use custody_primitives::network_fee::NetworkFee;
use tracing::debug;

use crate::{context::CustodyCtx, errors::EngineResult, store::CustodyStore};

impl CustodyCtx<'_> {
    /// Refreshes max gas and gas rate of the items still pending in the current queue.
    pub(crate) fn reprice_current_queue(&mut self) -> EngineResult<()> {
        let height = self.height;
        let mut txout = self.store().txout(height)?;
        let mut changed = Vec::new();

        for item in txout.items.iter_mut().filter(|i| i.is_pending()) {
            if item.chain.is_native() {
                continue;
            }
            let Some(fee) = self
                .store()
                .network_fee(item.chain)?
                .filter(NetworkFee::is_valid)
            else {
                continue;
            };

            let max_gas = vec![fee.max_gas()];
            if item.max_gas == max_gas && item.gas_rate == fee.transaction_fee_rate {
                continue;
            }

            item.max_gas = max_gas;
            item.gas_rate = fee.transaction_fee_rate;
            changed.push(item.clone());
        }

        if changed.is_empty() {
            return Ok(());
        }
        self.store_mut().put_txout(&txout)?;

        for item in &changed {
            if item.in_hash.is_blank() {
                continue;
            }
            if let Some(mut voter) = self.store().voter(&item.in_hash)? {
                voter.update_action_item(height, item);
                self.store_mut().put_voter(&voter)?;
            }
        }

        debug!(%height, repriced = changed.len(), "refreshed outbound gas");
        Ok(())
    }
}
