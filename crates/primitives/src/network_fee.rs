//! Per-chain network fee estimates.

use serde::{Deserialize, Serialize};

use crate::{
    asset::Coin,
    chain::Chain,
    types::{mul_div, Amount},
};

/// Headroom applied on top of the estimated gas when computing the maximum a vault may spend,
/// in basis points.
const MAX_GAS_HEADROOM_BPS: u64 = 15_000;

/// Estimated transaction size and fee rate on a chain, as reported by observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkFee {
    /// The chain.
    pub chain: Chain,

    /// Typical size of an outbound transaction, in the chain's size unit.
    pub transaction_size: u64,

    /// Fee rate per size unit, in the gas asset's smallest unit.
    pub transaction_fee_rate: u64,
}

impl NetworkFee {
    /// Creates a new estimate.
    pub const fn new(chain: Chain, transaction_size: u64, transaction_fee_rate: u64) -> Self {
        Self {
            chain,
            transaction_size,
            transaction_fee_rate,
        }
    }

    /// Returns whether the estimate is usable.
    pub const fn is_valid(&self) -> bool {
        self.transaction_size > 0 && self.transaction_fee_rate > 0
    }

    /// Estimated gas for one outbound.
    pub const fn estimated_gas(&self) -> Amount {
        self.transaction_size.saturating_mul(self.transaction_fee_rate)
    }

    /// Maximum gas a vault may spend on one outbound, in the chain's gas asset.
    pub fn max_gas(&self) -> Coin {
        Coin::new(
            self.chain.gas_asset(),
            mul_div(self.estimated_gas(), MAX_GAS_HEADROOM_BPS, 10_000),
        )
    }
}
