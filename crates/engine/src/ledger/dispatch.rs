//! Crediting inbounds on consensus and handing them downstream once final.

use custody_primitives::{
    memo::{Memo, MemoKind},
    tx::ObservedTx,
    vault::VaultStatus,
};
use tracing::{debug, info, warn};

use crate::{
    context::CustodyCtx,
    errors::EngineResult,
    events::CustodyEvent,
    handler::{HandlerError, InboundHandler},
    ledger::Direction,
    store::CustodyStore,
    voter::{
        events::VoterEvent,
        state::{VaultCredit, VoterState},
    },
};

impl CustodyCtx<'_> {
    /// Applies the canonical copy of an inbound to its vault.
    ///
    /// Shared vaults are credited with the coins. A per-node vault is only credited by a funding
    /// transfer sent from a shared vault, which also clears the matching pending funding height.
    pub(super) fn credit_inbound(&mut self, tx: &ObservedTx) -> EngineResult<()> {
        let pub_key = &tx.observed_pub_key;
        let vault = self.require_vault(pub_key)?;
        let memo = self.memo_parser.parse(&tx.tx.memo).ok();

        let funding = memo
            .as_ref()
            .is_some_and(|m| m.kind == MemoKind::YggdrasilFund);
        let credited = if vault.is_shared() {
            true
        } else {
            funding
                && self
                    .vault_for_address(tx.tx.chain, &tx.tx.from_address)?
                    .is_some_and(|sender| sender.is_shared())
        };

        if credited {
            self.credit_funds(pub_key, &tx.tx.coins)?;
        }

        let mut vault = self.require_vault(pub_key)?;
        vault.inbound_tx_count += 1;
        if credited && vault.is_per_node() {
            if let Some(height) = memo.as_ref().and_then(|m| m.block_height) {
                vault.remove_pending_height(height);
            }
        }
        self.store_mut().put_vault(&vault)?;

        if !credited {
            debug!(tx_id = %tx.tx.id, vault = %pub_key, "inbound not credited to per-node vault");
            return Ok(());
        }

        let credit = VaultCredit {
            vault: pub_key.clone(),
            coins: tx.tx.coins.clone(),
        };
        self.advance_voter(
            Direction::Inbound,
            &tx.tx.id,
            VoterEvent::RecordCredit { credit },
        )?;

        self.emit(CustodyEvent::PendingLiquidity {
            tx_id: tx.tx.id.clone(),
            vault: pub_key.clone(),
            coins: tx.tx.coins.clone(),
        });

        Ok(())
    }

    /// Hands a final inbound to `handler`, or to its refund path if it cannot be processed.
    pub(super) fn dispatch_finalised(
        &mut self,
        tx: &ObservedTx,
        handler: &dyn InboundHandler,
    ) -> EngineResult<()> {
        let tx_id = &tx.tx.id;
        self.store_mut()
            .remove_pending_finalisation(tx.tx.chain, tx_id)?;
        self.emit(CustodyEvent::Finalised {
            tx_id: tx_id.clone(),
            height: self.height,
        });

        let vault = self.store().vault(&tx.observed_pub_key)?;
        let shared = vault.as_ref().is_some_and(|v| v.is_shared());
        let active = vault
            .as_ref()
            .is_some_and(|v| v.status != VaultStatus::Inactive);

        match self.memo_parser.parse(&tx.tx.memo) {
            Ok(memo) if memo.kind.is_outbound() || memo.kind.is_internal() || !shared => {
                debug!(%tx_id, kind = ?memo.kind, "nothing to dispatch");
            }
            Err(e) => self.refund_inbound(tx, handler, &format!("invalid memo: {e}")),
            Ok(_) if !active => self.refund_inbound(tx, handler, "vault is inactive"),
            Ok(memo) => self.handle_inbound(tx, &memo, handler),
        }

        let done = self.store().voter(tx_id)?.is_some_and(|v| {
            v.actions().is_empty() && matches!(v.state(), VoterState::Finalised { .. })
        });
        if done {
            self.advance_voter(Direction::Inbound, tx_id, VoterEvent::MarkDone)?;
        }

        info!(%tx_id, "dispatched final inbound");
        Ok(())
    }

    fn handle_inbound(&mut self, tx: &ObservedTx, memo: &Memo, handler: &dyn InboundHandler) {
        let res: Result<(), HandlerError> = self.atomically(|ctx| handler.handle(ctx, tx, memo));
        if let Err(e) = res {
            warn!(tx_id = %tx.tx.id, %e, "inbound handler failed");
            self.refund_inbound(tx, handler, &e.to_string());
        }
    }

    fn refund_inbound(&mut self, tx: &ObservedTx, handler: &dyn InboundHandler, reason: &str) {
        let res: Result<(), HandlerError> =
            self.atomically(|ctx| handler.refund(ctx, tx, reason));
        if let Err(e) = res {
            warn!(tx_id = %tx.tx.id, %reason, %e, "refund failed");
        }
    }
}
