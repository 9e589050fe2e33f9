use custody_primitives::{ids::TxId, types::BlockHeight};

use crate::voter::{
    config::VoterCfg,
    duties::VoterDuty,
    errors::{VoterError, VoterResult},
    events::VoterEvent,
    machine::{ObservationVoter, VoterOutput},
    state::{VaultCredit, VoterState},
};

impl ObservationVoter {
    /// Finalises a voter in consensus once its chain is deep enough past the transaction.
    pub(crate) fn process_chain_height(
        &mut self,
        cfg: &VoterCfg,
        height: BlockHeight,
    ) -> VoterResult<VoterOutput> {
        match self.state {
            VoterState::ConsensusReached { consensus_height } => {
                if !self.depth_reached(height) {
                    return Ok(VoterOutput::new());
                }

                Ok(VoterOutput::with_duties(
                    self.finalise(cfg.height, consensus_height)
                        .into_iter()
                        .collect(),
                ))
            }

            VoterState::Pending => Err(VoterError::rejected(
                &self.state,
                &VoterEvent::ChainHeight { height },
                "no consensus yet",
            )),

            VoterState::Finalised { .. } | VoterState::Done { .. } => Err(VoterError::duplicate(
                &self.state,
                &VoterEvent::ChainHeight { height },
            )),

            VoterState::Reverted { .. } => Err(VoterError::rejected(
                &self.state,
                &VoterEvent::ChainHeight { height },
                "chain height irrelevant after revert",
            )),
        }
    }

    /// Records the credit applied on consensus. A voter is credited at most once.
    pub(crate) fn process_record_credit(
        &mut self,
        credit: VaultCredit,
    ) -> VoterResult<VoterOutput> {
        if !self.state.has_consensus() {
            return Err(VoterError::invalid_event(
                &self.state,
                &VoterEvent::RecordCredit { credit },
                Some("credit before consensus".to_string()),
            ));
        }

        if self.credit.is_some() {
            return Err(VoterError::duplicate(
                &self.state,
                &VoterEvent::RecordCredit { credit },
            ));
        }

        self.credit = Some(credit);
        Ok(VoterOutput::new())
    }

    /// Records an observed outbound and completes the voter once all its outbounds are seen.
    pub(crate) fn process_outbound_observed(
        &mut self,
        out_hash: TxId,
    ) -> VoterResult<VoterOutput> {
        if !self.state.has_consensus() {
            return Err(VoterError::rejected(
                &self.state,
                &VoterEvent::OutboundObserved { out_hash },
                "outbound for a transaction without consensus",
            ));
        }

        if self.out_txs.contains(&out_hash) {
            return Err(VoterError::duplicate(
                &self.state,
                &VoterEvent::OutboundObserved { out_hash },
            ));
        }

        self.out_txs.push(out_hash);

        if let VoterState::Finalised {
            consensus_height,
            finalised_height,
        } = self.state
        {
            if self.all_actions_observed() {
                self.state = VoterState::Done {
                    consensus_height,
                    finalised_height,
                };
            }
        }

        Ok(VoterOutput::new())
    }

    /// Reverts a voter that is not final yet, undoing its credit.
    pub(crate) fn process_revert(&mut self, cfg: &VoterCfg) -> VoterResult<VoterOutput> {
        match self.state {
            VoterState::Pending => {
                self.state = VoterState::Reverted {
                    consensus_height: None,
                    reverted_height: cfg.height,
                };

                Ok(VoterOutput::new())
            }

            VoterState::ConsensusReached { consensus_height } => {
                self.state = VoterState::Reverted {
                    consensus_height: Some(consensus_height),
                    reverted_height: cfg.height,
                };

                let duties = self
                    .credit
                    .clone()
                    .map(|credit| VoterDuty::UndoCredit { credit })
                    .into_iter()
                    .collect();

                Ok(VoterOutput::with_duties(duties))
            }

            VoterState::Finalised { .. } | VoterState::Done { .. } => Err(VoterError::rejected(
                &self.state,
                &VoterEvent::Revert,
                "a finalised transaction cannot be reverted",
            )),

            VoterState::Reverted { .. } => {
                Err(VoterError::duplicate(&self.state, &VoterEvent::Revert))
            }
        }
    }

    /// Completes a finalised voter that produced no outbound.
    pub(crate) fn process_mark_done(&mut self) -> VoterResult<VoterOutput> {
        match self.state {
            VoterState::Finalised {
                consensus_height,
                finalised_height,
            } => {
                self.state = VoterState::Done {
                    consensus_height,
                    finalised_height,
                };

                Ok(VoterOutput::new())
            }

            VoterState::Done { .. } => {
                Err(VoterError::duplicate(&self.state, &VoterEvent::MarkDone))
            }

            _ => Err(VoterError::invalid_event(
                &self.state,
                &VoterEvent::MarkDone,
                Some("only a finalised transaction can be done".to_string()),
            )),
        }
    }
}
