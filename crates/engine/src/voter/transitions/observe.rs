use std::collections::BTreeSet;

use custody_primitives::{ids::NodeAddress, tx::ObservedTx, types::BlockHeight};

use crate::voter::{
    config::VoterCfg,
    duties::VoterDuty,
    errors::{VoterError, VoterResult},
    events::VoterEvent,
    machine::{ObservationVoter, VoterOutput},
    state::VoterState,
};

impl ObservationVoter {
    /// Records a validator's copy and advances the voter if a supermajority now agrees.
    ///
    /// Copies are always recorded, even after a terminal state, so that observation accounting
    /// stays accurate.
    pub(crate) fn process_observe(
        &mut self,
        cfg: &VoterCfg,
        signer: NodeAddress,
        copy: ObservedTx,
    ) -> VoterResult<VoterOutput> {
        if copy.tx.id != *self.tx_id() {
            let event = VoterEvent::Observe { signer, copy };
            return Err(VoterError::invalid_event(
                &self.state,
                &event,
                Some(format!("copy does not belong to {}", self.tx_id())),
            ));
        }

        if self.has_signed(&signer, &copy) {
            return Err(VoterError::duplicate(
                &self.state,
                &VoterEvent::Observe { signer, copy },
            ));
        }

        self.record_signer(signer.clone(), copy.clone());

        match self.state.clone() {
            VoterState::Pending => Ok(self.try_reach_consensus(cfg)),

            VoterState::ConsensusReached { consensus_height } => {
                // Final copies are refunded with their group once it reaches consensus.
                let mut refunds = BTreeSet::new();
                if !copy.is_final() && self.is_forgiven(cfg, &copy, consensus_height) {
                    refunds.insert(signer);
                }

                let mut duties = Vec::new();
                if let Some((tx, signers)) = self.consensus_copy(cfg, true) {
                    refunds.extend(signers);
                    self.canonical = Some(tx.clone());
                    self.state = VoterState::Finalised {
                        consensus_height,
                        finalised_height: cfg.height,
                    };
                    duties.push(VoterDuty::DispatchFinalised { tx });
                } else if self.depth_reached(cfg.last_chain_height) {
                    duties.extend(self.finalise(cfg.height, consensus_height));
                }

                if !refunds.is_empty() {
                    duties.insert(
                        0,
                        VoterDuty::RefundObservationPoints {
                            signers: refunds.into_iter().collect(),
                        },
                    );
                }

                Ok(VoterOutput::with_duties(duties))
            }

            VoterState::Finalised {
                consensus_height,
                finalised_height,
            }
            | VoterState::Done {
                consensus_height,
                finalised_height,
            } => {
                let reference = if copy.is_final() {
                    finalised_height
                } else {
                    consensus_height
                };

                if self.is_forgiven(cfg, &copy, reference) {
                    return Ok(VoterOutput::with_duties(vec![
                        VoterDuty::RefundObservationPoints {
                            signers: vec![signer],
                        },
                    ]));
                }

                Ok(VoterOutput::new())
            }

            VoterState::Reverted { .. } => Ok(VoterOutput::new()),
        }
    }

    /// Moves a pending voter to consensus if a copy has a supermajority, preferring final
    /// copies.
    fn try_reach_consensus(&mut self, cfg: &VoterCfg) -> VoterOutput {
        let Some((tx, signers)) = self
            .consensus_copy(cfg, true)
            .or_else(|| self.consensus_copy(cfg, false))
        else {
            return VoterOutput::new();
        };

        self.canonical = Some(tx.clone());
        self.state = VoterState::ConsensusReached {
            consensus_height: cfg.height,
        };

        let mut duties = vec![
            VoterDuty::ApplyConsensus { tx: tx.clone() },
            VoterDuty::RefundObservationPoints {
                signers: signers.into_iter().collect(),
            },
        ];

        if tx.is_final() || self.depth_reached(cfg.last_chain_height) {
            duties.extend(self.finalise(cfg.height, cfg.height));
        }

        VoterOutput::with_duties(duties)
    }

    /// Moves the voter to [`VoterState::Finalised`] and returns the dispatch duty.
    pub(super) fn finalise(
        &mut self,
        height: BlockHeight,
        consensus_height: BlockHeight,
    ) -> Option<VoterDuty> {
        let tx = self.canonical.clone()?;
        self.state = VoterState::Finalised {
            consensus_height,
            finalised_height: height,
        };

        Some(VoterDuty::DispatchFinalised { tx })
    }

    /// Returns whether a late copy matching the canonical content, submitted within the
    /// flexibility window after `reference`, should have its observation points refunded.
    fn is_forgiven(&self, cfg: &VoterCfg, copy: &ObservedTx, reference: BlockHeight) -> bool {
        let matches = self
            .canonical
            .as_ref()
            .is_some_and(|canonical| canonical.same_content(copy));

        matches && cfg.height <= reference.saturating_add(cfg.observation_delay_flexibility)
    }
}
