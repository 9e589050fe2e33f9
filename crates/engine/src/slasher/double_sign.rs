//! Double-sign evidence.

use custody_primitives::{
    ids::NodeAddress,
    types::{mul_div, Amount, BlockHeight, BASIS_POINTS},
};
use tracing::{debug, info, warn};

use crate::{context::CustodyCtx, errors::EngineResult, events::CustodyEvent, store::CustodyStore};

/// Proof that a validator signed two conflicting native blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoubleSignEvidence {
    /// The offending validator.
    pub node: NodeAddress,

    /// Native height of the conflicting blocks.
    pub height: BlockHeight,
}

impl CustodyCtx<'_> {
    /// Burns a fixed fraction of the offender's bond into the reserve and returns the amount
    /// burnt. Evidence older than the maximum age is ignored.
    pub fn handle_double_sign(&mut self, evidence: &DoubleSignEvidence) -> EngineResult<Amount> {
        let age = self.height.saturating_sub(evidence.height);
        if age > self.params.double_sign_max_age {
            debug!(node = %evidence.node, %age, "ignoring stale double-sign evidence");
            return Ok(0);
        }

        let Some(mut validator) = self.store().validator(&evidence.node)? else {
            warn!(node = %evidence.node, "double-sign evidence for unknown validator");
            return Ok(0);
        };

        let burn = mul_div(validator.bond, self.params.double_sign_slash_bps, BASIS_POINTS);
        let taken = validator.reduce_bond(burn);
        if taken == 0 {
            return Ok(0);
        }

        self.store_mut().put_validator(&validator)?;
        self.store_mut().credit_reserve(taken)?;

        info!(node = %evidence.node, amount = %taken, "burnt bond for double signing");
        self.emit(CustodyEvent::BondSlashed {
            node: evidence.node.clone(),
            amount: taken,
            reason: "double sign".to_string(),
        });

        Ok(taken)
    }
}
