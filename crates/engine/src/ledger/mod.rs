//! The Observation Ledger.
//!
//! Validators submit their copies of external transactions here. The ledger drives one
//! [`ObservationVoter`] per transaction and direction and performs the duties the voter emits:
//! crediting vaults on consensus, refunding observation points, dispatching final inbounds to the
//! [`InboundHandler`] and settling observed outbounds.

mod dispatch;
mod errata;
mod outbound;

#[cfg(test)]
mod tests;

use std::fmt;

use custody_primitives::{
    chain::Chain,
    ids::{NodeAddress, TxId},
    tx::ObservedTx,
    types::BlockHeight,
    validator::NodeStatus,
    vault::VaultStatus,
};
use tracing::{debug, warn};

use crate::{
    context::CustodyCtx,
    errors::{EngineError, EngineResult},
    events::CustodyEvent,
    handler::InboundHandler,
    state_machine::StateMachine,
    store::CustodyStore,
    validators::PointKind,
    voter::{duties::VoterDuty, events::VoterEvent, machine::ObservationVoter},
};

/// Which way an observed transaction moves funds relative to the vault it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Funds entering the vault.
    Inbound,

    /// Funds leaving the vault.
    Outbound,
}

/// Why a submission was dropped without being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The signer is not a known validator.
    UnknownSigner,

    /// The observed vault does not exist.
    UnknownVault,

    /// The observed vault is inactive and the transaction never reached consensus.
    InactiveVault,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreReason::UnknownSigner => write!(f, "unknown signer"),
            IgnoreReason::UnknownVault => write!(f, "unknown vault"),
            IgnoreReason::InactiveVault => write!(f, "inactive vault"),
        }
    }
}

/// The result of submitting one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The copy was recorded.
    Accepted,

    /// The signer already submitted exactly this copy; nothing changed.
    AlreadyRecorded,

    /// The copy was recorded but differs from another copy by the same signer.
    ConflictingCopy,

    /// The copy was dropped.
    Ignored(IgnoreReason),
}

impl CustodyCtx<'_> {
    /// Records `signer`'s copy of an inbound transaction.
    pub fn submit_observation(
        &mut self,
        signer: &NodeAddress,
        copy: ObservedTx,
        handler: &dyn InboundHandler,
    ) -> EngineResult<SubmitOutcome> {
        self.submit(Direction::Inbound, signer, copy, handler)
    }

    /// Records `signer`'s copy of a transaction leaving a vault.
    pub fn submit_outbound_observation(
        &mut self,
        signer: &NodeAddress,
        copy: ObservedTx,
        handler: &dyn InboundHandler,
    ) -> EngineResult<SubmitOutcome> {
        self.submit(Direction::Outbound, signer, copy, handler)
    }

    /// Raises the last observed height of `chain` and finalises every voter of that chain that
    /// is now deep enough.
    pub fn observe_chain_height(
        &mut self,
        chain: Chain,
        height: BlockHeight,
        handler: &dyn InboundHandler,
    ) -> EngineResult<()> {
        if height <= self.store().last_chain_height(chain)? {
            return Ok(());
        }
        self.store_mut().put_last_chain_height(chain, height)?;

        let cfg = self.voter_cfg(chain)?;
        for tx_id in self.store().pending_finalisation(chain)? {
            let Some(mut voter) = self.store().voter(&tx_id)? else {
                self.store_mut().remove_pending_finalisation(chain, &tx_id)?;
                continue;
            };

            let output = match voter.process_event(&cfg, VoterEvent::ChainHeight { height }) {
                Ok(output) => output,
                Err(e) => {
                    debug!(%tx_id, %e, "dropping voter from finalisation index");
                    self.store_mut().remove_pending_finalisation(chain, &tx_id)?;
                    continue;
                }
            };
            self.store_mut().put_voter(&voter)?;
            self.perform_duties(Direction::Inbound, &tx_id, output.duties, handler)?;
        }

        Ok(())
    }

    fn submit(
        &mut self,
        direction: Direction,
        signer: &NodeAddress,
        copy: ObservedTx,
        handler: &dyn InboundHandler,
    ) -> EngineResult<SubmitOutcome> {
        copy.validate()
            .map_err(|reason| EngineError::InvalidInput(reason.to_string()))?;

        let Some(validator) = self.store().validator(signer)? else {
            debug!(%signer, "ignoring observation from unknown signer");
            return Ok(SubmitOutcome::Ignored(IgnoreReason::UnknownSigner));
        };
        let Some(vault) = self.store().vault(&copy.observed_pub_key)? else {
            debug!(vault = %copy.observed_pub_key, "ignoring observation for unknown vault");
            return Ok(SubmitOutcome::Ignored(IgnoreReason::UnknownVault));
        };

        let tx_id = copy.tx.id.clone();
        let mut voter = self
            .load_voter(direction, &tx_id)?
            .unwrap_or_else(|| ObservationVoter::new(tx_id.clone()));

        if vault.status == VaultStatus::Inactive && voter.state().consensus_height().is_none() {
            debug!(vault = %vault.pub_key, %tx_id, "ignoring observation for inactive vault");
            return Ok(SubmitOutcome::Ignored(IgnoreReason::InactiveVault));
        }
        if voter.has_signed(signer, &copy) {
            return Ok(SubmitOutcome::AlreadyRecorded);
        }
        let conflicting = voter.conflicts_with(signer, &copy);
        if conflicting {
            warn!(%signer, %tx_id, "validator submitted conflicting copies");
        }

        // only copies from the active set count towards consensus
        if validator.status == NodeStatus::Active {
            let points = self.params.observe_slash_points;
            self.add_slash_points(signer, PointKind::Observation, points, "observation")?;
        }

        let cfg = self.voter_cfg(copy.tx.chain)?;
        let output = voter.process_event(
            &cfg,
            VoterEvent::Observe {
                signer: signer.clone(),
                copy,
            },
        )?;
        self.save_voter(direction, &voter)?;
        self.perform_duties(direction, &tx_id, output.duties, handler)?;

        Ok(if conflicting {
            SubmitOutcome::ConflictingCopy
        } else {
            SubmitOutcome::Accepted
        })
    }

    /// Performs the duties emitted by the voter of `tx_id`, in order.
    fn perform_duties(
        &mut self,
        direction: Direction,
        tx_id: &TxId,
        duties: Vec<VoterDuty>,
        handler: &dyn InboundHandler,
    ) -> EngineResult<()> {
        for duty in duties {
            match duty {
                VoterDuty::ApplyConsensus { tx } => {
                    self.record_consensus(direction, &tx)?;
                    match direction {
                        Direction::Inbound => self.credit_inbound(&tx)?,
                        Direction::Outbound => self.settle_outbound(&tx)?,
                    }
                }

                VoterDuty::RefundObservationPoints { signers } => {
                    let points = self.params.observe_slash_points;
                    for signer in &signers {
                        self.refund_slash_points(
                            signer,
                            PointKind::Observation,
                            points,
                            "observation matched consensus",
                        )?;
                    }
                }

                VoterDuty::DispatchFinalised { tx } => match direction {
                    Direction::Inbound => self.dispatch_finalised(&tx, handler)?,
                    Direction::Outbound => {
                        self.emit(CustodyEvent::Finalised {
                            tx_id: tx_id.clone(),
                            height: self.height,
                        });
                        self.advance_voter(direction, tx_id, VoterEvent::MarkDone)?;
                    }
                },

                VoterDuty::UndoCredit { credit } => {
                    self.debit_funds(&credit.vault, &credit.coins)?;
                }
            }
        }

        Ok(())
    }

    /// Indexes the consensus height of `tx` for the observation deadline.
    fn record_consensus(&mut self, direction: Direction, tx: &ObservedTx) -> EngineResult<()> {
        let height = self.height;
        self.store_mut().index_consensus(height, &tx.tx.id)?;
        self.emit(CustodyEvent::ConsensusReached {
            tx_id: tx.tx.id.clone(),
            height,
        });

        if direction == Direction::Inbound {
            let waiting = self
                .store()
                .voter(&tx.tx.id)?
                .is_some_and(|v| !v.state().is_finalised());
            if waiting {
                self.store_mut()
                    .add_pending_finalisation(tx.tx.chain, &tx.tx.id)?;
            }
        }

        Ok(())
    }

    fn load_voter(
        &self,
        direction: Direction,
        tx_id: &TxId,
    ) -> EngineResult<Option<ObservationVoter>> {
        Ok(match direction {
            Direction::Inbound => self.store().voter(tx_id)?,
            Direction::Outbound => self.store().outbound_voter(tx_id)?,
        })
    }

    fn save_voter(&mut self, direction: Direction, voter: &ObservationVoter) -> EngineResult<()> {
        match direction {
            Direction::Inbound => self.store_mut().put_voter(voter)?,
            Direction::Outbound => self.store_mut().put_outbound_voter(voter)?,
        }

        Ok(())
    }

    /// Feeds `event` to the stored voter of `tx_id` and performs no duties.
    ///
    /// Only used for events that emit none.
    fn advance_voter(
        &mut self,
        direction: Direction,
        tx_id: &TxId,
        event: VoterEvent,
    ) -> EngineResult<()> {
        let Some(mut voter) = self.load_voter(direction, tx_id)? else {
            return Err(EngineError::InvalidInput(format!("no voter for {tx_id}")));
        };

        let chain = voter
            .canonical()
            .map(|tx| tx.tx.chain)
            .unwrap_or(Chain::Thor);
        let cfg = self.voter_cfg(chain)?;
        voter.process_event(&cfg, event)?;
        self.save_voter(direction, &voter)
    }
}
