//! Errata votes: reverting transactions their chain dropped.

use custody_primitives::ids::{NodeAddress, TxId};
use tracing::{debug, info};

use crate::{
    context::CustodyCtx,
    errata::{ErrataDuty, ErrataEvent, ErrataVoter},
    errors::{EngineError, EngineResult},
    events::CustodyEvent,
    handler::InboundHandler,
    ledger::{Direction, IgnoreReason, SubmitOutcome},
    state_machine::StateMachine,
    store::CustodyStore,
    voter::events::VoterEvent,
};

impl CustodyCtx<'_> {
    /// Records `signer`'s vote that `tx_id` was dropped by its chain. Once a supermajority of
    /// active validators agrees, the inbound voter is reverted and its credit undone.
    pub fn submit_errata(
        &mut self,
        signer: &NodeAddress,
        tx_id: &TxId,
        handler: &dyn InboundHandler,
    ) -> EngineResult<SubmitOutcome> {
        if self.store().validator(signer)?.is_none() {
            debug!(%signer, "ignoring errata from unknown signer");
            return Ok(SubmitOutcome::Ignored(IgnoreReason::UnknownSigner));
        }

        let Some(mut voter) = self.store().voter(tx_id)? else {
            return Err(EngineError::InvalidInput(format!("no observation of {tx_id}")));
        };
        let Some(chain) = voter
            .canonical()
            .or_else(|| voter.buckets().first().map(|b| &b.tx))
            .map(|tx| tx.tx.chain)
        else {
            return Err(EngineError::InvalidInput(format!("no observation of {tx_id}")));
        };

        let cfg = self.voter_cfg(chain)?;
        let mut errata = self
            .store()
            .errata_voter(tx_id)?
            .unwrap_or_else(|| ErrataVoter::new(tx_id.clone()));
        let output = errata.process_event(
            &cfg,
            ErrataEvent::Vote {
                signer: signer.clone(),
            },
        )?;
        self.store_mut().put_errata_voter(&errata)?;

        for duty in output.duties {
            let ErrataDuty::RevertObservation { tx_id } = duty;

            let reverted = voter.process_event(&cfg, VoterEvent::Revert)?;
            self.store_mut().put_voter(&voter)?;
            self.store_mut()
                .remove_pending_finalisation(chain, &tx_id)?;
            self.perform_duties(Direction::Inbound, &tx_id, reverted.duties, handler)?;

            info!(%tx_id, "reverted observed transaction");
            self.emit(CustodyEvent::Reverted {
                tx_id,
                height: self.height,
            });
        }

        Ok(SubmitOutcome::Accepted)
    }
}
