//! Slash point and jail bookkeeping of validators.

use std::collections::BTreeSet;

use custody_primitives::{
    chain::Chain,
    ids::NodeAddress,
    types::BlockHeight,
    validator::Validator,
};
use tracing::{debug, info};

use crate::{
    context::CustodyCtx,
    errors::EngineResult,
    events::CustodyEvent,
    store::CustodyStore,
    voter::config::VoterCfg,
};

/// The counter slash points are booked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PointKind {
    Observation,
    Signing,
}

impl CustodyCtx<'_> {
    /// Node addresses of the current active set.
    pub(crate) fn active_signers(&self) -> EngineResult<BTreeSet<NodeAddress>> {
        Ok(self
            .store()
            .active_validators()?
            .into_iter()
            .map(|v| v.address)
            .collect())
    }

    /// The voter configuration for a transaction on `chain` at the current height.
    pub(crate) fn voter_cfg(&self, chain: Chain) -> EngineResult<VoterCfg> {
        let active_signers = self.active_signers()?;
        let threshold = self.params.consensus_threshold(active_signers.len());

        Ok(VoterCfg {
            height: self.height,
            active_signers,
            threshold,
            observation_delay_flexibility: self.params.observation_delay_flexibility,
            last_chain_height: self.store().last_chain_height(chain)?,
        })
    }

    /// Adds `points` to `node`'s counter. Unknown nodes are skipped.
    pub(crate) fn add_slash_points(
        &mut self,
        node: &NodeAddress,
        kind: PointKind,
        points: u64,
        reason: &str,
    ) -> EngineResult<()> {
        if points == 0 {
            return Ok(());
        }

        let Some(mut validator) = self.store().validator(node)? else {
            debug!(%node, "skipping slash points for unknown validator");
            return Ok(());
        };

        let counter = counter_mut(&mut validator, kind);
        *counter = counter.saturating_add(points);
        self.store_mut().put_validator(&validator)?;

        self.emit(CustodyEvent::SlashPoints {
            node: node.clone(),
            delta: i64::try_from(points).unwrap_or(i64::MAX),
            reason: reason.to_string(),
        });

        Ok(())
    }

    /// Removes up to `points` from `node`'s counter.
    pub(crate) fn refund_slash_points(
        &mut self,
        node: &NodeAddress,
        kind: PointKind,
        points: u64,
        reason: &str,
    ) -> EngineResult<()> {
        if points == 0 {
            return Ok(());
        }

        let Some(mut validator) = self.store().validator(node)? else {
            return Ok(());
        };

        let counter = counter_mut(&mut validator, kind);
        let removed = points.min(*counter);
        *counter -= removed;
        if removed == 0 {
            return Ok(());
        }
        self.store_mut().put_validator(&validator)?;

        self.emit(CustodyEvent::SlashPoints {
            node: node.clone(),
            delta: -i64::try_from(removed).unwrap_or(i64::MAX),
            reason: reason.to_string(),
        });

        Ok(())
    }

    /// Jails `node` for `blocks` blocks from now. An existing longer jail is kept.
    pub(crate) fn jail(
        &mut self,
        node: &NodeAddress,
        blocks: u64,
        reason: &str,
    ) -> EngineResult<()> {
        let Some(mut validator) = self.store().validator(node)? else {
            return Ok(());
        };

        let until: BlockHeight = self.height.saturating_add(blocks);
        if validator.jail_until >= until {
            return Ok(());
        }

        validator.jail_until = until;
        validator.jail_reason = reason.to_string();
        self.store_mut().put_validator(&validator)?;

        info!(%node, %until, %reason, "validator jailed");
        self.emit(CustodyEvent::Jailed {
            node: node.clone(),
            until,
            reason: reason.to_string(),
        });

        Ok(())
    }

    /// Decays the slash points of every validator when the current height is on the decay
    /// interval.
    pub(crate) fn decay_slash_points(&mut self) -> EngineResult<()> {
        let interval = self.params.slash_point_decay_interval;
        let amount = self.params.slash_point_decay;
        if interval == 0 || amount == 0 || self.height % interval != 0 {
            return Ok(());
        }

        for mut validator in self.store().validators()? {
            if validator.slash_points.total() == 0 {
                continue;
            }

            validator.slash_points.decay(amount);
            self.store_mut().put_validator(&validator)?;
        }

        debug!(height = %self.height, %amount, "decayed slash points");
        Ok(())
    }
}

fn counter_mut(validator: &mut Validator, kind: PointKind) -> &mut u64 {
    match kind {
        PointKind::Observation => &mut validator.slash_points.observation,
        PointKind::Signing => &mut validator.slash_points.signing,
    }
}
