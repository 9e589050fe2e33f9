//! Penalties for not observing.

use custody_primitives::types::BlockHeight;
use tracing::debug;

use crate::{
    context::CustodyCtx,
    errors::EngineResult,
    store::CustodyStore,
    validators::PointKind,
    voter::machine::ObservationVoter,
};

impl CustodyCtx<'_> {
    /// Penalizes every eligible active validator that did not sign a transaction which reached
    /// consensus exactly `window` blocks ago.
    pub fn penalize_lack_of_observation(&mut self, window: u64) -> EngineResult<()> {
        let Some(consensus_height) = self.height.checked_sub(window) else {
            return Ok(());
        };
        let penalty = self.params.lack_of_observation_penalty;
        if penalty == 0 {
            return Ok(());
        }

        for tx_id in self.store().consensus_at(consensus_height)? {
            let voters = [
                self.store().voter(&tx_id)?,
                self.store().outbound_voter(&tx_id)?,
            ];
            for voter in voters.into_iter().flatten() {
                if voter.state().consensus_height() != Some(consensus_height) {
                    continue;
                }
                self.penalize_missing_signers(&voter, consensus_height, penalty)?;
            }
        }

        Ok(())
    }

    fn penalize_missing_signers(
        &mut self,
        voter: &ObservationVoter,
        consensus_height: BlockHeight,
        penalty: u64,
    ) -> EngineResult<()> {
        let height = self.height;
        let missing: Vec<_> = self
            .store()
            .active_validators()?
            .into_iter()
            .filter(|v| {
                !voter.is_signer(&v.address)
                    && !v.is_jailed(height)
                    && v.active_since <= consensus_height
            })
            .map(|v| v.address)
            .collect();

        for node in &missing {
            debug!(%node, tx_id = %voter.tx_id(), "validator did not observe transaction");
            self.add_slash_points(node, PointKind::Observation, penalty, "lack of observation")?;
        }

        Ok(())
    }
}
